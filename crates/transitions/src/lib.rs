//! Frame-accurate transition engine.
//!
//! ```text
//!   TransitionConfig ─prepare()─▶ ProgramPlan ─▶ Renderer::compile_shader_program
//!                                     │ (failure: cross-fade program)
//!   start() ─▶ FrameScheduler::request_frame
//!                 │
//!   pump(frame) ◀─┘ elapsed ─▶ progress ─▶ easing ─▶ family uniforms ─▶ draw
//!                 │                                  │
//!                 └─▶ observers: on_progress ─▶ on_complete / metrics
//! ```
//!
//! Timing never depends on the GPU. With a disabled renderer, or
//! `GpuMode::Disabled`, runs advance and notify observers exactly as they
//! would with pixels on screen.

mod compose;
mod engine;
mod metrics;
mod observer;
mod presets;
mod state;

pub use compose::FrameInput;
pub use engine::TransitionEngine;
pub use metrics::{TransitionMetrics, FRAME_DROP_FPS, FRAME_WINDOW};
pub use observer::{CallbackObserver, ChannelObserver, TransitionEvent, TransitionObserver};
pub use presets::{PresetCatalog, PresetError, TransitionPreset};
pub use state::{TransitionPhase, TransitionState};
