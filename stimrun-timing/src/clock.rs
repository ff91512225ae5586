use std::time::{Duration, Instant};

/// Trait for the run clock driving stimulus transitions.
///
/// `reset` rebases the clock at the trigger; `run_elapsed` is the time since
/// that rebase and is what all onset comparisons use.
pub trait Clock: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;

    fn now(&self) -> Self::Timestamp;
    fn elapsed_since(&self, ts: Self::Timestamp) -> Duration;
    fn reset(&mut self);
    fn run_elapsed(&self) -> Duration;
    fn record_frame(&mut self, d: Duration);
    fn pacing(&self) -> FramePacing;
}

/// Frame-interval statistics reported at the end of a run. Onset transitions
/// are quantized to frame boundaries, so the mean interval bounds how late a
/// stimulus can appear after its scheduled onset.
#[derive(Debug, Clone)]
pub struct FramePacing {
    pub frames: usize,
    pub mean_frame_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_ns: f64,
    pub max_frame_ns: f64,
    pub effective_fps: f64,
}

impl FramePacing {
    fn empty() -> Self {
        FramePacing {
            frames: 0,
            mean_frame_ns: 0.0,
            jitter_ns: 0.0,
            min_frame_ns: 0.0,
            max_frame_ns: 0.0,
            effective_fps: 0.0,
        }
    }
}

/// Monotonic wall clock backed by `Instant`, rebased when the trigger lands.
#[derive(Debug, Clone)]
pub struct RunClock {
    epoch: Instant,
    frame_intervals: Vec<Duration>,
    max_samples: usize,
}

impl RunClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            frame_intervals: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }
}

impl Default for RunClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RunClock {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    fn elapsed_since(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    fn reset(&mut self) {
        self.epoch = Instant::now();
    }

    fn run_elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn record_frame(&mut self, d: Duration) {
        if self.frame_intervals.len() >= self.max_samples {
            self.frame_intervals.remove(0);
        }
        self.frame_intervals.push(d);
    }

    fn pacing(&self) -> FramePacing {
        pacing_from(&self.frame_intervals)
    }
}

fn pacing_from(intervals: &[Duration]) -> FramePacing {
    if intervals.is_empty() {
        return FramePacing::empty();
    }
    let times: Vec<f64> = intervals.iter().map(|d| d.as_nanos() as f64).collect();
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    let var = times.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / times.len() as f64;
    let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    FramePacing {
        frames: intervals.len(),
        mean_frame_ns: mean,
        jitter_ns: var.sqrt(),
        min_frame_ns: min,
        max_frame_ns: max,
        effective_fps: if mean > 0.0 { 1e9 / mean } else { 0.0 },
    }
}
