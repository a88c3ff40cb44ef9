use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shaderlib::{wrap_custom_fragment, CustomUniform, UniformValue, MAX_CUSTOM_UNIFORMS};

use crate::easing::Easing;
use crate::ConfigError;

/// Family tag written as the `type` discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionFamily {
    Fade,
    Slide,
    Zoom,
    Wipe,
    Glitch,
    Blur,
    Dissolve,
    Custom,
}

impl TransitionFamily {
    pub const ALL: [TransitionFamily; 8] = [
        TransitionFamily::Fade,
        TransitionFamily::Slide,
        TransitionFamily::Zoom,
        TransitionFamily::Wipe,
        TransitionFamily::Glitch,
        TransitionFamily::Blur,
        TransitionFamily::Dissolve,
        TransitionFamily::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransitionFamily::Fade => "fade",
            TransitionFamily::Slide => "slide",
            TransitionFamily::Zoom => "zoom",
            TransitionFamily::Wipe => "wipe",
            TransitionFamily::Glitch => "glitch",
            TransitionFamily::Blur => "blur",
            TransitionFamily::Dissolve => "dissolve",
            TransitionFamily::Custom => "custom",
        }
    }
}

impl fmt::Display for TransitionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionFamily {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        TransitionFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == needle)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown transition family '{value}'")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuMode {
    #[default]
    Auto,
    Force,
    Disabled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl PerformanceTier {
    /// Fraction of the viewport used for intermediate passes. `None` means the
    /// effect is drawn in a single direct pass.
    pub fn intermediate_scale(self) -> Option<f32> {
        match self {
            PerformanceTier::Low => None,
            PerformanceTier::Medium => Some(0.5),
            PerformanceTier::High => Some(0.75),
            PerformanceTier::Ultra => Some(1.0),
        }
    }
}

/// Screen-space direction of travel. Vectors use texture space, so `Down`
/// points toward increasing `y`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Left,
    #[default]
    Right,
    Up,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub fn vector(self) -> [f32; 2] {
        const D: f32 = std::f32::consts::FRAC_1_SQRT_2;
        match self {
            Direction::Left => [-1.0, 0.0],
            Direction::Right => [1.0, 0.0],
            Direction::Up => [0.0, -1.0],
            Direction::Down => [0.0, 1.0],
            Direction::UpLeft => [-D, -D],
            Direction::UpRight => [D, -D],
            Direction::DownLeft => [-D, D],
            Direction::DownRight => [D, D],
        }
    }

    /// Turns an axis direction into the diagonal a quarter turn clockwise of
    /// it. Diagonals are returned unchanged.
    pub fn diagonal(self) -> Self {
        match self {
            Direction::Left => Direction::UpLeft,
            Direction::Right => Direction::DownRight,
            Direction::Up => Direction::UpRight,
            Direction::Down => Direction::DownLeft,
            other => other,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadeType {
    #[default]
    Black,
    White,
    Cross,
    Transparent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FadeParams {
    pub fade_type: FadeType,
    pub overlay_opacity: f32,
}

impl Default for FadeParams {
    fn default() -> Self {
        Self {
            fade_type: FadeType::Black,
            overlay_opacity: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlideParams {
    pub direction: Direction,
    /// Width of the blended band between the two surfaces, in `[0, 1]`.
    pub overlap: f32,
    pub parallax: bool,
    pub parallax_intensity: f32,
}

impl Default for SlideParams {
    fn default() -> Self {
        Self {
            direction: Direction::Left,
            overlap: 0.0,
            parallax: false,
            parallax_intensity: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomType {
    #[default]
    In,
    Out,
    Pulsar,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoomParams {
    pub zoom_type: ZoomType,
    /// Normalized origin, `[0.5, 0.5]` is the centre.
    pub origin: [f32; 2],
    pub intensity: f32,
    /// Total rotation over the run, in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
}

impl Default for ZoomParams {
    fn default() -> Self {
        Self {
            zoom_type: ZoomType::In,
            origin: [0.5, 0.5],
            intensity: 1.0,
            rotation: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WipeType {
    #[default]
    Linear,
    Radial,
    Gradient,
    Diagonal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WipeParams {
    pub wipe_type: WipeType,
    pub direction: Direction,
    pub softness: f32,
    /// Winding of radial wipes.
    pub clockwise: bool,
}

impl Default for WipeParams {
    fn default() -> Self {
        Self {
            wipe_type: WipeType::Linear,
            direction: Direction::Right,
            softness: 0.05,
            clockwise: true,
        }
    }
}

impl WipeParams {
    /// Direction the wipe edge travels in, after diagonal wipes have turned
    /// axis directions into diagonals.
    pub fn effective_direction(&self) -> Direction {
        match self.wipe_type {
            WipeType::Diagonal => self.direction.diagonal(),
            _ => self.direction,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlitchType {
    #[default]
    RgbSplit,
    Noise,
    Chromatic,
    Digital,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlitchParams {
    pub glitch_type: GlitchType,
    pub intensity: f32,
    pub block_count: u32,
    /// Channel offset in pixels at full strength.
    pub rgb_offset: [f32; 2],
}

impl Default for GlitchParams {
    fn default() -> Self {
        Self {
            glitch_type: GlitchType::RgbSplit,
            intensity: 0.6,
            block_count: 12,
            rgb_offset: [12.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlurParams {
    /// Peak blur radius in pixels, reached halfway through.
    pub radius: f32,
}

impl Default for BlurParams {
    fn default() -> Self {
        Self { radius: 24.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DissolveParams {
    /// Edge length of one dissolve cell in pixels.
    pub cell_size: f32,
    pub softness: f32,
}

impl Default for DissolveParams {
    fn default() -> Self {
        Self {
            cell_size: 4.0,
            softness: 0.1,
        }
    }
}

/// Caller-supplied program. `shader` names a program registered with the
/// engine; `source`, when present, is used instead and registered under that
/// name for the run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomParams {
    pub shader: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl CustomParams {
    /// Slot layout of the caller uniforms. Slots follow name order.
    pub fn uniform_layout(&self) -> Vec<CustomUniform> {
        self.uniforms
            .iter()
            .map(|(name, value)| CustomUniform::new(name.clone(), value.kind()))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransitionKind {
    Fade(FadeParams),
    Slide(SlideParams),
    Zoom(ZoomParams),
    Wipe(WipeParams),
    Glitch(GlitchParams),
    Blur(BlurParams),
    Dissolve(DissolveParams),
    Custom(CustomParams),
}

impl TransitionKind {
    pub fn family(&self) -> TransitionFamily {
        match self {
            TransitionKind::Fade(_) => TransitionFamily::Fade,
            TransitionKind::Slide(_) => TransitionFamily::Slide,
            TransitionKind::Zoom(_) => TransitionFamily::Zoom,
            TransitionKind::Wipe(_) => TransitionFamily::Wipe,
            TransitionKind::Glitch(_) => TransitionFamily::Glitch,
            TransitionKind::Blur(_) => TransitionFamily::Blur,
            TransitionKind::Dissolve(_) => TransitionFamily::Dissolve,
            TransitionKind::Custom(_) => TransitionFamily::Custom,
        }
    }
}

/// A complete transition description: family parameters plus timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionConfig {
    #[serde(flatten)]
    pub kind: TransitionKind,
    #[serde(default = "default_duration", with = "crate::duration")]
    pub duration: Duration,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default)]
    pub gpu_mode: GpuMode,
    #[serde(default)]
    pub performance_tier: PerformanceTier,
}

fn default_duration() -> Duration {
    Duration::from_millis(1000)
}

impl TransitionConfig {
    pub fn new(kind: TransitionKind, duration: Duration) -> Self {
        Self {
            kind,
            duration,
            easing: Easing::default(),
            gpu_mode: GpuMode::default(),
            performance_tier: PerformanceTier::default(),
        }
    }

    pub fn with_easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = easing.into();
        self
    }

    pub fn with_gpu_mode(mut self, gpu_mode: GpuMode) -> Self {
        self.gpu_mode = gpu_mode;
        self
    }

    pub fn with_performance_tier(mut self, tier: PerformanceTier) -> Self {
        self.performance_tier = tier;
        self
    }

    pub fn family(&self) -> TransitionFamily {
        self.kind.family()
    }

    /// Parses and validates a JSON configuration object.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: TransitionConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks everything that can be checked without knowing which custom
    /// programs are registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration.is_zero() {
            return Err(ConfigError::NonPositiveDuration);
        }
        self.easing.validate().map_err(ConfigError::Invalid)?;

        match &self.kind {
            TransitionKind::Fade(params) => {
                unit_interval("overlayOpacity", params.overlay_opacity)?;
            }
            TransitionKind::Slide(params) => {
                unit_interval("overlap", params.overlap)?;
                non_negative("parallaxIntensity", params.parallax_intensity)?;
            }
            TransitionKind::Zoom(params) => {
                finite("origin[0]", params.origin[0])?;
                finite("origin[1]", params.origin[1])?;
                non_negative("intensity", params.intensity)?;
                if let Some(rotation) = params.rotation {
                    finite("rotation", rotation)?;
                }
            }
            TransitionKind::Wipe(params) => {
                unit_interval("softness", params.softness)?;
            }
            TransitionKind::Glitch(params) => {
                non_negative("intensity", params.intensity)?;
                if params.block_count == 0 {
                    return Err(ConfigError::Invalid(
                        "glitch blockCount must be at least 1".into(),
                    ));
                }
                finite("rgbOffset[0]", params.rgb_offset[0])?;
                finite("rgbOffset[1]", params.rgb_offset[1])?;
            }
            TransitionKind::Blur(params) => {
                non_negative("radius", params.radius)?;
            }
            TransitionKind::Dissolve(params) => {
                non_negative("cellSize", params.cell_size)?;
                if params.cell_size < 1.0 {
                    return Err(ConfigError::Invalid(
                        "dissolve cellSize must be at least one pixel".into(),
                    ));
                }
                unit_interval("softness", params.softness)?;
            }
            TransitionKind::Custom(params) => validate_custom(params)?,
        }
        Ok(())
    }
}

fn validate_custom(params: &CustomParams) -> Result<(), ConfigError> {
    if params.shader.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "custom transitions need a shader id".into(),
        ));
    }
    if params.uniforms.len() > MAX_CUSTOM_UNIFORMS {
        return Err(ConfigError::Invalid(format!(
            "custom shader '{}' sets {} uniforms; at most {MAX_CUSTOM_UNIFORMS} are supported",
            params.shader,
            params.uniforms.len()
        )));
    }
    for (name, value) in &params.uniforms {
        if !value.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "custom uniform '{name}' must be finite"
            )));
        }
    }
    if let Some(source) = &params.source {
        wrap_custom_fragment(source, &params.uniform_layout())?;
    }
    Ok(())
}

fn finite(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must be finite (got {value})")))
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    Ok(())
}

fn unit_interval(field: &str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{field} must lie in [0, 1] (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::EasingCurve;

    #[test]
    fn parses_fade_configuration() {
        let config = TransitionConfig::from_json(
            r#"{"type": "fade", "fadeType": "black", "duration": 500, "easing": "easeInOut"}"#,
        )
        .unwrap();
        assert_eq!(config.family(), TransitionFamily::Fade);
        assert_eq!(config.duration, Duration::from_millis(500));
        assert_eq!(config.easing, Easing::Named(EasingCurve::EaseInOut));
        assert_eq!(config.gpu_mode, GpuMode::Auto);
        match config.kind {
            TransitionKind::Fade(params) => {
                assert_eq!(params.fade_type, FadeType::Black);
                assert_eq!(params.overlay_opacity, 1.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn family_fields_default_when_omitted() {
        let config = TransitionConfig::from_json(r#"{"type": "glitch", "duration": "1s"}"#).unwrap();
        assert_eq!(config.duration, Duration::from_secs(1));
        assert_eq!(config.kind, TransitionKind::Glitch(GlitchParams::default()));
        assert_eq!(config.performance_tier, PerformanceTier::High);
    }

    #[test]
    fn rejects_unknown_family_tag() {
        let err = TransitionConfig::from_json(r#"{"type": "spin", "duration": 300}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)), "{err}");
        assert!(err.to_string().contains("spin"));
    }

    #[test]
    fn rejects_missing_family_tag() {
        assert!(TransitionConfig::from_json(r#"{"duration": 300}"#).is_err());
    }

    #[test]
    fn rejects_zero_duration() {
        let err = TransitionConfig::from_json(r#"{"type": "fade", "duration": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveDuration));
    }

    #[test]
    fn rejects_zero_block_count_and_bad_softness() {
        let glitch = TransitionConfig::new(
            TransitionKind::Glitch(GlitchParams {
                block_count: 0,
                ..GlitchParams::default()
            }),
            Duration::from_millis(400),
        );
        assert!(glitch.validate().is_err());

        let wipe = TransitionConfig::new(
            TransitionKind::Wipe(WipeParams {
                softness: 1.5,
                ..WipeParams::default()
            }),
            Duration::from_millis(400),
        );
        assert!(wipe.validate().is_err());

        let zoom = TransitionConfig::new(
            TransitionKind::Zoom(ZoomParams {
                rotation: Some(f32::NAN),
                ..ZoomParams::default()
            }),
            Duration::from_millis(400),
        );
        assert!(zoom.validate().is_err());
    }

    #[test]
    fn custom_sources_are_checked_when_inline() {
        let config = TransitionConfig::from_json(
            r#"{
                "type": "custom",
                "shader": "ripple",
                "source": "vec4 transition(vec2 uv) { return getToColor(uv) * amount; }",
                "uniforms": {"amount": 0.5, "centre": [0.5, 0.5]},
                "duration": 800
            }"#,
        )
        .unwrap();
        let TransitionKind::Custom(params) = &config.kind else {
            panic!("expected custom");
        };
        let layout = params.uniform_layout();
        assert_eq!(layout[0].name, "amount");
        assert_eq!(layout[1].name, "centre");

        let err = TransitionConfig::from_json(
            r#"{"type": "custom", "shader": "broken", "source": "void main() {}", "duration": 800}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::CustomShader(_)), "{err}");

        let err = TransitionConfig::from_json(r#"{"type": "custom", "duration": 800}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn json_roundtrip_keeps_type_tag() {
        let config = TransitionConfig::new(
            TransitionKind::Slide(SlideParams::default()),
            Duration::from_millis(600),
        )
        .with_easing(EasingCurve::Smoothstep);
        let json = config.to_json().unwrap();
        assert!(json.contains(r#""type": "slide""#));
        assert!(json.contains(r#""duration": 600"#));
        assert_eq!(TransitionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn diagonal_wipes_turn_axis_directions() {
        let params = WipeParams {
            wipe_type: WipeType::Diagonal,
            direction: Direction::Right,
            ..WipeParams::default()
        };
        assert_eq!(params.effective_direction(), Direction::DownRight);
        let [x, y] = params.effective_direction().vector();
        assert!((x * x + y * y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn families_parse_from_names() {
        assert_eq!("Zoom".parse::<TransitionFamily>().unwrap(), TransitionFamily::Zoom);
        assert!("spin".parse::<TransitionFamily>().is_err());
    }
}
