use std::time::{Duration, Instant};

use crate::foundation::core::Fps;

/// Paces frame emission so the captured stream runs at real time.
///
/// The pacer is an injectable boundary: production code sleeps to per-frame
/// deadlines, tests advance instantly while preserving the frame-count
/// contract.
pub trait FramePacer {
    /// Reset pacing for a new pass at `fps`.
    fn begin(&mut self, fps: Fps);
    /// Block until the next frame deadline.
    fn tick(&mut self);
}

/// Deadline-based real-time pacer.
///
/// Deadlines accumulate from the first tick rather than from `now`, so sleep
/// jitter does not drift the overall duration.
#[derive(Debug, Default)]
pub struct RealTimePacer {
    interval: Duration,
    next: Option<Instant>,
}

impl RealTimePacer {
    /// Create an idle pacer; `begin` sets the frame interval.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FramePacer for RealTimePacer {
    fn begin(&mut self, fps: Fps) {
        self.interval = Duration::from_secs_f64(fps.frame_duration_secs());
        self.next = None;
    }

    fn tick(&mut self) {
        let now = Instant::now();
        let deadline = self.next.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        // If we fell behind, rebase on `now` instead of sprinting to catch up.
        self.next = Some(deadline.max(now) + self.interval);
    }
}

/// Pacer that never waits; used by tests and offline (faster-than-real-time)
/// rendering.
#[derive(Debug, Default)]
pub struct NoopPacer;

impl FramePacer for NoopPacer {
    fn begin(&mut self, _fps: Fps) {}

    fn tick(&mut self) {}
}
