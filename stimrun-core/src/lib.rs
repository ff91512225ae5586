pub mod phase;
pub mod stimulus;
pub mod trial;

pub use phase::{Phase, RunPhase};
pub use stimulus::{STATIC_SLOTS, StimulusView};
pub use trial::{
    INSTRUCTION_TEXT, ONSETS_SECS, STIMULI, STIMULUS_DURATION, Schedule, Trial, TrialState,
};
