//! Frame timing.

use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Counts presented frames and reports the frame rate once per interval.
#[derive(Debug)]
pub struct FrameTimer {
    start: Instant,
    last_tick: Instant,
    window_start: Instant,
    window_frames: u32,
    total_frames: u64,
}

impl FrameTimer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            start: now,
            last_tick: now,
            window_start: now,
            window_frames: 0,
            total_frames: 0,
        }
    }

    /// Total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Total number of frames recorded with [`FrameTimer::tick`].
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Record one frame. Returns the frame delta and, once per second, the
    /// average frame rate over the elapsed interval.
    pub fn tick(&mut self) -> (Duration, Option<f64>) {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> (Duration, Option<f64>) {
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.total_frames += 1;
        self.window_frames += 1;

        let window = now.saturating_duration_since(self.window_start);
        if window < REPORT_INTERVAL {
            return (delta, None);
        }

        let fps = f64::from(self.window_frames) / window.as_secs_f64();
        self.window_start = now;
        self.window_frames = 0;
        tracing::debug!("{fps:.1} fps ({} frames total)", self.total_frames);
        (delta, Some(fps))
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
