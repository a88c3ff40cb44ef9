//! Configuration schema for transitions and preset files.
//!
//! A [`TransitionConfig`] is a tagged union keyed by `type`, plus the timing
//! fields every family shares. The same schema is used for JSON configs handed
//! to the engine and for the `config` tables of TOML preset files.

pub mod duration;
mod easing;
mod file;
mod transition;

pub use easing::{Easing, EasingCurve};
pub use file::{PresetEntry, PresetFile, PRESET_FILE_VERSION};
pub use transition::{
    BlurParams, CustomParams, Direction, DissolveParams, FadeParams, FadeType, GlitchParams,
    GlitchType, GpuMode, PerformanceTier, SlideParams, TransitionConfig, TransitionFamily,
    TransitionKind, WipeParams, WipeType, ZoomParams, ZoomType,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse preset file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to parse transition config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("transition duration must be greater than zero")]
    NonPositiveDuration,
    #[error("invalid custom shader: {0}")]
    CustomShader(#[from] shaderlib::WrapError),
    #[error("custom shader '{0}' is not registered and no source was supplied")]
    UnknownCustomShader(String),
}
