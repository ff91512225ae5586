use std::time::Duration;

/// The fixed stimulus label set; the generator permutes these per subject.
pub const STIMULI: [&str; 3] = ["Sam", "Kirsten", "Ari"];

/// Scheduled onsets in seconds since the trigger, applied by row position
/// after the labels are permuted. Never permuted themselves.
pub const ONSETS_SECS: [f64; 3] = [4.0, 8.0, 10.0];

/// How long each label stays on screen once its onset has passed.
pub const STIMULUS_DURATION: Duration = Duration::from_millis(1500);

/// Idle-screen text shown until the trigger arrives.
pub const INSTRUCTION_TEXT: &str = "Send me a trigger!";

/// One scheduled presentation: a label and its onset relative to the trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub label: String,
    pub onset_secs: f64,
}

impl Trial {
    pub fn new(label: impl Into<String>, onset_secs: f64) -> Self {
        Self {
            label: label.into(),
            onset_secs,
        }
    }

    pub fn onset(&self) -> Duration {
        Duration::from_secs_f64(self.onset_secs)
    }
}

/// Ordered trial sequence for one subject. Row order is presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub subject: u32,
    pub trials: Vec<Trial>,
}

impl Schedule {
    pub fn new(subject: u32, trials: Vec<Trial>) -> Self {
        Self { subject, trials }
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Labels in presentation order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.trials.iter().map(|t| t.label.as_str())
    }
}

/// Sub-states of a single trial while the run clock approaches its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Fixation,
    Stimulus,
}
