pub mod generate;
pub mod table;

pub use generate::generate;
pub use table::{ScheduleError, read_table, schedule_filename, write_table};
