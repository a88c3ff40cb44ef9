//! Frame pacing for the transition engine.
//!
//! The engine never sleeps or reads a clock itself. It asks a
//! [`FrameScheduler`] for the next frame and receives the frame's timestamp:
//!
//! ```text
//!   request_frame() ──▶ pending ──wait_for_frame()──▶ Some(now)
//!         ▲                 │
//!         └─────────────────┴── cancel_frame() ──▶ idle
//! ```
//!
//! [`IntervalScheduler`] paces frames against the monotonic clock;
//! [`ManualScheduler`] runs a virtual clock so timing is reproducible.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use rand::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("frame rate must be positive and finite (got {0})")]
    InvalidFps(f32),
    #[error("frame interval must be greater than zero")]
    ZeroInterval,
}

/// Single-shot "render next frame" primitive.
///
/// Timestamps are measured from the scheduler's own epoch. At most one frame
/// request is outstanding at a time; requesting again while one is pending
/// does nothing.
pub trait FrameScheduler {
    /// Current time on this scheduler's clock.
    fn now(&self) -> Duration;

    /// Asks for one more frame. Returns `false` if a request was already
    /// pending.
    fn request_frame(&mut self) -> bool;

    fn cancel_frame(&mut self);

    fn has_pending_frame(&self) -> bool;

    /// Blocks until the pending frame is due and consumes the request.
    /// Returns the frame timestamp, or `None` when nothing was requested.
    fn wait_for_frame(&mut self) -> Option<Duration>;
}

impl<S: FrameScheduler + ?Sized> FrameScheduler for &mut S {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn request_frame(&mut self) -> bool {
        (**self).request_frame()
    }

    fn cancel_frame(&mut self) {
        (**self).cancel_frame()
    }

    fn has_pending_frame(&self) -> bool {
        (**self).has_pending_frame()
    }

    fn wait_for_frame(&mut self) -> Option<Duration> {
        (**self).wait_for_frame()
    }
}

fn interval_for_fps(fps: f32) -> Result<Duration, SchedulerError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(SchedulerError::InvalidFps(fps));
    }
    Duration::try_from_secs_f64(1.0 / f64::from(fps))
        .map_err(|_| SchedulerError::InvalidFps(fps))
}

/// Real-time pacing at a fixed target rate.
#[derive(Debug)]
pub struct IntervalScheduler {
    epoch: Instant,
    interval: Duration,
    last_frame: Option<Instant>,
    pending: bool,
}

impl IntervalScheduler {
    pub fn new(fps: f32) -> Result<Self, SchedulerError> {
        Ok(Self {
            epoch: Instant::now(),
            interval: interval_for_fps(fps)?,
            last_frame: None,
            pending: false,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FrameScheduler for IntervalScheduler {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn request_frame(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    fn cancel_frame(&mut self) {
        self.pending = false;
    }

    fn has_pending_frame(&self) -> bool {
        self.pending
    }

    fn wait_for_frame(&mut self) -> Option<Duration> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        if let Some(last) = self.last_frame {
            let deadline = last + self.interval;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }
        let frame = Instant::now();
        self.last_frame = Some(frame);
        Some(frame.duration_since(self.epoch))
    }
}

enum Pacing {
    Fixed(Duration),
    Scripted {
        intervals: VecDeque<Duration>,
        last: Duration,
    },
    Jittered {
        base: Duration,
        jitter: Duration,
        rng: StdRng,
    },
}

/// Virtual clock that only moves when a frame is consumed or when advanced
/// by hand. Never sleeps.
pub struct ManualScheduler {
    clock: Duration,
    pacing: Pacing,
    pending: bool,
}

impl ManualScheduler {
    /// Every frame advances the clock by `step`.
    pub fn fixed(step: Duration) -> Result<Self, SchedulerError> {
        if step.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        Ok(Self::with_pacing(Pacing::Fixed(step)))
    }

    pub fn from_fps(fps: f32) -> Result<Self, SchedulerError> {
        Self::fixed(interval_for_fps(fps)?)
    }

    /// Frames follow `intervals` in order; once the script runs out the last
    /// interval repeats.
    pub fn scripted(intervals: impl IntoIterator<Item = Duration>) -> Result<Self, SchedulerError> {
        let intervals: VecDeque<Duration> = intervals.into_iter().collect();
        if intervals.is_empty() || intervals.iter().any(Duration::is_zero) {
            return Err(SchedulerError::ZeroInterval);
        }
        let last = intervals.back().copied().unwrap_or_default();
        Ok(Self::with_pacing(Pacing::Scripted { intervals, last }))
    }

    /// Each interval is `base` plus a uniform random extra in `[0, jitter]`,
    /// drawn from a seeded generator so runs are reproducible.
    pub fn jittered(base: Duration, jitter: Duration, seed: u64) -> Result<Self, SchedulerError> {
        if base.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        Ok(Self::with_pacing(Pacing::Jittered {
            base,
            jitter,
            rng: StdRng::seed_from_u64(seed),
        }))
    }

    fn with_pacing(pacing: Pacing) -> Self {
        Self {
            clock: Duration::ZERO,
            pacing,
            pending: false,
        }
    }

    /// Moves the clock forward without producing a frame.
    pub fn advance(&mut self, by: Duration) {
        self.clock += by;
    }

    fn next_interval(&mut self) -> Duration {
        match &mut self.pacing {
            Pacing::Fixed(step) => *step,
            Pacing::Scripted { intervals, last } => intervals.pop_front().unwrap_or(*last),
            Pacing::Jittered { base, jitter, rng } => {
                let extra = if jitter.is_zero() {
                    Duration::ZERO
                } else {
                    jitter.mul_f64(rng.gen::<f64>())
                };
                *base + extra
            }
        }
    }
}

impl FrameScheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.clock
    }

    fn request_frame(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    fn cancel_frame(&mut self) {
        self.pending = false;
    }

    fn has_pending_frame(&self) -> bool {
        self.pending
    }

    fn wait_for_frame(&mut self) -> Option<Duration> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        let step = self.next_interval();
        self.clock += step;
        Some(self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_fixed_step_advances_per_frame() {
        let mut scheduler = ManualScheduler::fixed(Duration::from_millis(16)).unwrap();
        assert_eq!(scheduler.now(), Duration::ZERO);
        assert!(scheduler.request_frame());
        assert_eq!(scheduler.wait_for_frame(), Some(Duration::from_millis(16)));
        assert!(scheduler.request_frame());
        assert_eq!(scheduler.wait_for_frame(), Some(Duration::from_millis(32)));
    }

    #[test]
    fn only_one_request_is_outstanding() {
        let mut scheduler = ManualScheduler::fixed(Duration::from_millis(10)).unwrap();
        assert!(scheduler.request_frame());
        assert!(!scheduler.request_frame());
        assert!(scheduler.has_pending_frame());
        assert_eq!(scheduler.wait_for_frame(), Some(Duration::from_millis(10)));
        assert_eq!(scheduler.wait_for_frame(), None);
    }

    #[test]
    fn cancel_drops_pending_request() {
        let mut scheduler = ManualScheduler::fixed(Duration::from_millis(10)).unwrap();
        scheduler.request_frame();
        scheduler.cancel_frame();
        assert!(!scheduler.has_pending_frame());
        assert_eq!(scheduler.wait_for_frame(), None);
        assert_eq!(scheduler.now(), Duration::ZERO);
    }

    #[test]
    fn scripted_intervals_repeat_the_last_entry() {
        let mut scheduler = ManualScheduler::scripted([
            Duration::from_millis(10),
            Duration::from_millis(50),
        ])
        .unwrap();
        let mut stamps = Vec::new();
        for _ in 0..4 {
            scheduler.request_frame();
            stamps.push(scheduler.wait_for_frame().unwrap().as_millis());
        }
        assert_eq!(stamps, vec![10, 60, 110, 160]);
    }

    #[test]
    fn jittered_pacing_is_reproducible_and_bounded() {
        let run = |seed| {
            let mut scheduler = ManualScheduler::jittered(
                Duration::from_millis(16),
                Duration::from_millis(20),
                seed,
            )
            .unwrap();
            (0..20)
                .map(|_| {
                    scheduler.request_frame();
                    scheduler.wait_for_frame().unwrap()
                })
                .collect::<Vec<_>>()
        };
        let first = run(7);
        assert_eq!(first, run(7));
        let mut previous = Duration::ZERO;
        for stamp in first {
            let delta = stamp - previous;
            assert!(delta >= Duration::from_millis(16));
            assert!(delta <= Duration::from_millis(36));
            previous = stamp;
        }
    }

    #[test]
    fn manual_advance_moves_clock_without_frames() {
        let mut scheduler = ManualScheduler::fixed(Duration::from_millis(5)).unwrap();
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(scheduler.now(), Duration::from_millis(100));
        assert!(!scheduler.has_pending_frame());
    }

    #[test]
    fn rejects_degenerate_rates() {
        assert!(IntervalScheduler::new(0.0).is_err());
        assert!(IntervalScheduler::new(f32::NAN).is_err());
        assert!(ManualScheduler::fixed(Duration::ZERO).is_err());
        assert!(ManualScheduler::scripted(Vec::new()).is_err());
    }

    #[test]
    fn rates_too_slow_for_a_duration_are_rejected() {
        assert!(matches!(
            ManualScheduler::from_fps(1e-30),
            Err(SchedulerError::InvalidFps(_))
        ));
        assert!(matches!(
            IntervalScheduler::new(1e-30),
            Err(SchedulerError::InvalidFps(_))
        ));
    }

    #[test]
    fn interval_scheduler_paces_frames() {
        let mut scheduler = IntervalScheduler::new(200.0).unwrap();
        scheduler.request_frame();
        let first = scheduler.wait_for_frame().unwrap();
        scheduler.request_frame();
        let second = scheduler.wait_for_frame().unwrap();
        assert!(second - first >= scheduler.interval());
    }
}
