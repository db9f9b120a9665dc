//! Animation timeline and the tick loop that advances progress.

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::interpolate::clamp_progress;
use crate::{Easing, TransitionConfig};

/// Maps elapsed time to eased progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    duration: Duration,
    easing: Easing,
}

/// Progress at one instant of a timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Eased progress in `[0, 1]`.
    pub progress: f32,
    /// Whether the timeline has reached its end.
    pub finished: bool,
}

impl Timeline {
    /// Create a timeline.
    #[must_use]
    pub const fn new(duration: Duration, easing: Easing) -> Self {
        Self { duration, easing }
    }

    /// Timeline for a controller's configuration.
    #[must_use]
    pub fn from_config(config: &TransitionConfig) -> Self {
        Self::new(config.duration(), config.easing)
    }

    /// Total length.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Sample progress after `elapsed`, clamped to `[0, 1]` even for curves
    /// that overshoot. A zero duration is finished at once.
    #[must_use]
    pub fn sample(&self, elapsed: Duration) -> Sample {
        if self.duration.is_zero() || elapsed >= self.duration {
            return Sample {
                progress: 1.0,
                finished: true,
            };
        }
        #[allow(clippy::cast_possible_truncation)]
        let fraction = (elapsed.as_secs_f64() / self.duration.as_secs_f64()) as f32;
        Sample {
            progress: clamp_progress(self.easing.evaluate(fraction)),
            finished: false,
        }
    }
}

/// How a scheduler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The timeline reached its end; the last published progress was 1.
    Finished,
    /// The frame callback asked to stop.
    Cancelled,
}

/// Ticks a [`Timeline`] on the tokio clock.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    frame_interval: Duration,
}

impl Scheduler {
    /// Create a scheduler ticking every `frame_interval`.
    #[must_use]
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval: frame_interval.max(Duration::from_millis(1)),
        }
    }

    /// Publish progress to `on_frame` once per tick until the timeline ends.
    ///
    /// The first frame is published immediately. `on_frame` returns `false`
    /// to stop early.
    pub async fn run<F>(&self, timeline: Timeline, mut on_frame: F) -> RunOutcome
    where
        F: FnMut(f32) -> bool + Send,
    {
        let started = Instant::now();
        let mut ticker = time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let sample = timeline.sample(started.elapsed());
            if !on_frame(sample.progress) {
                return RunOutcome::Cancelled;
            }
            if sample.finished {
                return RunOutcome::Finished;
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(TransitionConfig::default().frame_interval())
    }
}
