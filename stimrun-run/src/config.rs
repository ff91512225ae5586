use std::time::Duration;

use stimrun_core::STIMULUS_DURATION;

/// Presentation run parameters.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Logical window size.
    pub width: u32,
    pub height: u32,
    /// Monitor index the fullscreen window goes to; falls back to the
    /// primary monitor when the index does not exist.
    pub screen: usize,
    /// How long each label stays up once its onset has passed.
    pub stimulus_duration: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            screen: 1,
            stimulus_duration: STIMULUS_DURATION,
        }
    }
}
