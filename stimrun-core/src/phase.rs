/// Defines run phases and their behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    /// Whether the trigger key is honored in this phase.
    fn accepts_trigger(&self) -> bool;
    fn next(&self) -> Option<Self>;

    fn is_waiting(&self) -> bool {
        false
    }
    fn is_trials(&self) -> bool {
        false
    }
    fn is_complete(&self) -> bool {
        false
    }
}

/// The three phases of a presentation run: idle until the scanner trigger,
/// then the timed trial sequence, then done.
#[derive(Copy, Debug, Clone, PartialEq, Default)]
pub enum RunPhase {
    #[default]
    WaitingForTrigger,
    Trials,
    Complete,
}

impl Phase for RunPhase {
    fn accepts_trigger(&self) -> bool {
        matches!(self, Self::WaitingForTrigger)
    }

    fn next(&self) -> Option<Self> {
        use RunPhase::*;
        Some(match self {
            WaitingForTrigger => Trials,
            Trials => Complete,
            Complete => return None,
        })
    }

    fn is_waiting(&self) -> bool {
        matches!(self, RunPhase::WaitingForTrigger)
    }

    fn is_trials(&self) -> bool {
        matches!(self, RunPhase::Trials)
    }

    fn is_complete(&self) -> bool {
        matches!(self, RunPhase::Complete)
    }
}
