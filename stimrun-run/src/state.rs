use std::time::Duration;

use stimrun_core::{Phase, Schedule, StimulusView, TrialState};
use stimrun_timing::Clock;
use tracing::debug;

use crate::config::RunConfig;

/// Run state transitions, surfaced so the caller can log them.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    TriggerReceived,
    StimulusOnset {
        index: usize,
        scheduled: Duration,
        actual: Duration,
    },
    StimulusOffset {
        index: usize,
        actual: Duration,
    },
    RunComplete {
        actual: Duration,
    },
}

/// Single-run presentation state machine.
///
/// Driven once per frame tick: the caller renders `view()`, then calls
/// `update()` to advance against the clock. All boundaries are lower bounds;
/// a transition happens on the first tick whose elapsed time has passed it.
/// Onsets compare against one reset point (the trigger), so an overrun never
/// shifts later trials; it only eats into their fixation windows.
pub struct RunStateMachine<P, C>
where
    P: Phase,
    C: Clock,
{
    pub phase: P,
    pub clock: C,
    pub config: RunConfig,
    pub schedule: Schedule,
    current: usize,
    trial_state: TrialState,
}

impl<P, C> RunStateMachine<P, C>
where
    P: Phase,
    C: Clock,
{
    pub fn new(config: RunConfig, schedule: Schedule, clock: C) -> Self {
        Self {
            phase: P::default(),
            clock,
            config,
            schedule,
            current: 0,
            trial_state: TrialState::Fixation,
        }
    }

    /// The trigger zeroes the run clock and starts the trial sequence.
    /// Ignored outside the waiting phase.
    pub fn handle_trigger(&mut self) -> Option<RunEvent> {
        if !self.phase.accepts_trigger() {
            return None;
        }
        self.clock.reset();
        if let Some(next) = self.phase.next() {
            self.phase = next;
        }
        self.current = 0;
        self.trial_state = TrialState::Fixation;
        Some(RunEvent::TriggerReceived)
    }

    /// Advances trial sub-states against the run clock. Called once per
    /// frame; may emit several events when a whole window has already
    /// passed (e.g. after a long frame overrun).
    pub fn update(&mut self) -> Vec<RunEvent> {
        let mut events = Vec::new();
        if !self.phase.is_trials() {
            return events;
        }

        let elapsed = self.clock.run_elapsed();
        while let Some(trial) = self.schedule.trials.get(self.current) {
            let onset = trial.onset();
            match self.trial_state {
                TrialState::Fixation => {
                    if elapsed < onset {
                        return events;
                    }
                    self.trial_state = TrialState::Stimulus;
                    debug!(trial = self.current, ?elapsed, "stimulus onset");
                    events.push(RunEvent::StimulusOnset {
                        index: self.current,
                        scheduled: onset,
                        actual: elapsed,
                    });
                }
                TrialState::Stimulus => {
                    if elapsed < onset + self.config.stimulus_duration {
                        return events;
                    }
                    debug!(trial = self.current, ?elapsed, "stimulus offset");
                    events.push(RunEvent::StimulusOffset {
                        index: self.current,
                        actual: elapsed,
                    });
                    self.current += 1;
                    self.trial_state = TrialState::Fixation;
                }
            }
        }

        // past the last trial's window
        if let Some(next) = self.phase.next() {
            self.phase = next;
        }
        events.push(RunEvent::RunComplete { actual: elapsed });
        events
    }

    /// What the display should show this frame; `None` once the run is over.
    pub fn view(&self) -> Option<StimulusView> {
        if self.phase.is_waiting() {
            Some(StimulusView::Instruction)
        } else if self.phase.is_trials() {
            match self.trial_state {
                TrialState::Fixation => Some(StimulusView::Fixation),
                TrialState::Stimulus => Some(StimulusView::Label {
                    index: self.current,
                }),
            }
        } else {
            None
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stimrun_core::{RunPhase, Trial};
    use stimrun_timing::FramePacing;

    /// Test clock advanced by hand, one tick per simulated frame.
    #[derive(Debug, Clone)]
    struct ManualClock {
        elapsed: Duration,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                elapsed: Duration::ZERO,
            }
        }

        fn advance_to(&mut self, secs: f64) {
            self.elapsed = Duration::from_secs_f64(secs);
        }
    }

    impl Clock for ManualClock {
        type Timestamp = u64;

        fn now(&self) -> u64 {
            self.elapsed.as_nanos() as u64
        }

        fn elapsed_since(&self, ts: u64) -> Duration {
            Duration::from_nanos(self.now().saturating_sub(ts))
        }

        fn reset(&mut self) {
            self.elapsed = Duration::ZERO;
        }

        fn run_elapsed(&self) -> Duration {
            self.elapsed
        }

        fn record_frame(&mut self, _d: Duration) {}

        fn pacing(&self) -> FramePacing {
            unimplemented!("not used by these tests")
        }
    }

    fn machine() -> RunStateMachine<RunPhase, ManualClock> {
        let schedule = Schedule::new(
            1,
            vec![
                Trial::new("Sam", 4.0),
                Trial::new("Kirsten", 8.0),
                Trial::new("Ari", 10.0),
            ],
        );
        RunStateMachine::new(RunConfig::default(), schedule, ManualClock::new())
    }

    fn triggered() -> RunStateMachine<RunPhase, ManualClock> {
        let mut m = machine();
        m.clock.advance_to(30.0); // pre-trigger idle time must not count
        assert_eq!(m.handle_trigger(), Some(RunEvent::TriggerReceived));
        m
    }

    #[test]
    fn waits_showing_instruction_until_trigger() {
        let mut m = machine();
        assert_eq!(m.view(), Some(StimulusView::Instruction));
        m.clock.advance_to(100.0);
        assert!(m.update().is_empty());
        assert_eq!(m.view(), Some(StimulusView::Instruction));
    }

    #[test]
    fn trigger_zeroes_the_run_clock() {
        let m = triggered();
        assert_eq!(m.clock.run_elapsed(), Duration::ZERO);
        assert!(m.phase.is_trials());
        assert_eq!(m.view(), Some(StimulusView::Fixation));
    }

    #[test]
    fn second_trigger_is_ignored() {
        let mut m = triggered();
        m.clock.advance_to(2.0);
        assert_eq!(m.handle_trigger(), None);
        assert_eq!(m.clock.run_elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn stimulus_never_appears_before_its_onset() {
        let mut m = triggered();
        m.clock.advance_to(3.999);
        assert!(m.update().is_empty());
        assert_eq!(m.view(), Some(StimulusView::Fixation));

        m.clock.advance_to(4.0);
        let events = m.update();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            RunEvent::StimulusOnset { index: 0, .. }
        ));
        assert_eq!(m.view(), Some(StimulusView::Label { index: 0 }));
    }

    #[test]
    fn stimulus_holds_through_its_window() {
        let mut m = triggered();
        m.clock.advance_to(4.0);
        m.update();

        m.clock.advance_to(5.499);
        assert!(m.update().is_empty());
        assert_eq!(m.view(), Some(StimulusView::Label { index: 0 }));

        m.clock.advance_to(5.5);
        let events = m.update();
        assert!(matches!(
            events[0],
            RunEvent::StimulusOffset { index: 0, .. }
        ));
        assert_eq!(m.view(), Some(StimulusView::Fixation));
    }

    #[test]
    fn full_run_walks_every_trial_then_completes() {
        let mut m = triggered();
        let script = [
            (4.0, StimulusView::Label { index: 0 }),
            (5.5, StimulusView::Fixation),
            (8.0, StimulusView::Label { index: 1 }),
            (9.5, StimulusView::Fixation),
            (10.0, StimulusView::Label { index: 2 }),
        ];
        for (secs, view) in script {
            m.clock.advance_to(secs);
            m.update();
            assert_eq!(m.view(), Some(view), "at t={secs}");
        }

        m.clock.advance_to(11.5);
        let events = m.update();
        assert!(matches!(events.last(), Some(RunEvent::RunComplete { .. })));
        assert!(m.is_finished());
        assert_eq!(m.view(), None);
    }

    #[test]
    fn overrun_skips_elapsed_windows_in_one_tick() {
        // frame stall until t=9: trial 0 whole window and trial 1 onset have
        // passed; the machine catches up without shifting trial 1's offset.
        let mut m = triggered();
        m.clock.advance_to(9.0);
        let events = m.update();
        assert!(matches!(events[0], RunEvent::StimulusOnset { index: 0, .. }));
        assert!(matches!(events[1], RunEvent::StimulusOffset { index: 0, .. }));
        assert!(matches!(events[2], RunEvent::StimulusOnset { index: 1, .. }));
        assert_eq!(events.len(), 3);
        assert_eq!(m.view(), Some(StimulusView::Label { index: 1 }));

        m.clock.advance_to(9.5);
        let events = m.update();
        assert!(matches!(events[0], RunEvent::StimulusOffset { index: 1, .. }));
    }

    #[test]
    fn onset_events_report_scheduled_and_actual_times() {
        let mut m = triggered();
        m.clock.advance_to(4.016);
        match &m.update()[0] {
            RunEvent::StimulusOnset {
                scheduled, actual, ..
            } => {
                assert_eq!(*scheduled, Duration::from_secs(4));
                assert_eq!(*actual, Duration::from_secs_f64(4.016));
            }
            other => panic!("expected onset, got {other:?}"),
        }
    }
}
