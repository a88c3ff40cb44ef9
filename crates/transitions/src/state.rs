use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Where a run is in its lifecycle.
///
/// ```text
///   idle ──start()──▶ running ──elapsed ≥ duration──▶ completing ──▶ complete
///    ▲   ◀─prepare()─ preparing        │
///    └──────────── cancel() ───────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPhase {
    #[default]
    Idle,
    Preparing,
    Running,
    Completing,
    Complete,
}

impl TransitionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionPhase::Idle => "idle",
            TransitionPhase::Preparing => "preparing",
            TransitionPhase::Running => "running",
            TransitionPhase::Completing => "completing",
            TransitionPhase::Complete => "complete",
        }
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the engine's timing state. Only the engine mutates it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionState {
    /// Linear progress in `[0, 1]`. Easing only affects what is drawn.
    pub progress: f32,
    pub phase: TransitionPhase,
    #[serde(with = "presetconfig::duration")]
    pub elapsed: Duration,
    #[serde(with = "presetconfig::duration")]
    pub remaining: Duration,
    pub is_active: bool,
    pub current_frame: u64,
    /// Average over the recent frame window.
    pub fps: f32,
    /// Renderer estimate, see `Renderer::estimate_gpu_memory_usage`.
    pub gpu_memory_usage: u64,
}

impl TransitionState {
    pub(crate) fn idle(duration: Duration) -> Self {
        Self {
            remaining: duration,
            ..Self::default()
        }
    }
}
