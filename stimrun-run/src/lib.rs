pub mod config;
pub mod state;

pub use config::RunConfig;
pub use state::{RunEvent, RunStateMachine};
