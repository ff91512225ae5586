pub mod render;

pub use render::{SkiaRenderer, render_text_pixmap};
