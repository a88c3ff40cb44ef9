//! Family dispatch: which program a configuration uses and which uniform
//! values it feeds that program each frame.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use presetconfig::{
    ConfigError, CustomParams, FadeType, GlitchType, GpuMode, TransitionConfig, TransitionKind,
    WipeType, ZoomType,
};
use renderer::{FrameSource, ProgramHandle, ProgramSource, Renderer, TextureSlot};
use shaderlib::{
    names, wrap_custom_fragment, CustomUniform, ShaderFamily, ShaderLibrary, UniformDecl,
    UniformValue,
};

pub(crate) const FROM_TEXTURE: &str = "transition:from";
pub(crate) const TO_TEXTURE: &str = "transition:to";
pub(crate) const BLUR_TARGET: &str = "transition:blur";

/// The two surfaces of one frame, borrowed from the caller for the duration
/// of a tick.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub from: FrameSource<'a>,
    pub to: FrameSource<'a>,
}

impl<'a> FrameInput<'a> {
    pub fn new(from: FrameSource<'a>, to: FrameSource<'a>) -> Self {
        Self { from, to }
    }
}

/// Built-in program used for a configuration. Custom configs have none.
pub(crate) fn shader_family(kind: &TransitionKind) -> Option<ShaderFamily> {
    let family = match kind {
        TransitionKind::Fade(_) => ShaderFamily::Fade,
        TransitionKind::Slide(_) => ShaderFamily::Slide,
        TransitionKind::Zoom(_) => ShaderFamily::Zoom,
        TransitionKind::Wipe(params) if params.wipe_type == WipeType::Radial => {
            ShaderFamily::RadialWipe
        }
        TransitionKind::Wipe(_) => ShaderFamily::Wipe,
        TransitionKind::Glitch(_) => ShaderFamily::Glitch,
        TransitionKind::Blur(_) => ShaderFamily::Blur,
        TransitionKind::Dissolve(_) => ShaderFamily::Dissolve,
        TransitionKind::Custom(_) => return None,
    };
    Some(family)
}

/// Fully assembled sources for the program a run wants.
#[derive(Debug, Clone)]
pub(crate) struct ProgramPlan {
    pub key: String,
    pub vertex: &'static str,
    pub fragment: String,
    pub uniforms: &'static [UniformDecl],
    pub custom: Vec<CustomUniform>,
}

impl ProgramPlan {
    /// Resolves the program for `config`. `custom_source` is the registered
    /// source for custom configs without inline source.
    pub fn resolve(
        config: &TransitionConfig,
        library: &ShaderLibrary,
        custom_source: Option<&str>,
    ) -> Result<Self, ConfigError> {
        match &config.kind {
            TransitionKind::Custom(params) => Self::custom(params, library, custom_source),
            kind => {
                let family = shader_family(kind).unwrap_or(ShaderFamily::Crossfade);
                let definition = library
                    .get(family)
                    .or_else(|| library.fallback())
                    .ok_or_else(|| {
                        ConfigError::Invalid(format!("no shader program for family '{family}'"))
                    })?;
                Ok(Self {
                    key: definition.family.key().to_string(),
                    vertex: definition.vertex,
                    fragment: definition.fragment_source(),
                    uniforms: definition.uniforms,
                    custom: Vec::new(),
                })
            }
        }
    }

    fn custom(
        params: &CustomParams,
        library: &ShaderLibrary,
        registered: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let source = params
            .source
            .as_deref()
            .or(registered)
            .ok_or_else(|| ConfigError::UnknownCustomShader(params.shader.clone()))?;
        let custom = params.uniform_layout();
        let fragment = wrap_custom_fragment(source, &custom)?;

        let mut hasher = DefaultHasher::new();
        fragment.hash(&mut hasher);
        Ok(Self {
            key: format!("custom:{}:{:016x}", params.shader, hasher.finish()),
            vertex: library.vertex_source(),
            fragment,
            uniforms: library
                .fallback()
                .map(|definition| definition.uniforms)
                .unwrap_or_default(),
            custom,
        })
    }
}

/// Per-run drawing state: the compiled program and how to draw with it.
#[derive(Debug, Clone)]
pub(crate) struct Composition {
    program: Option<ProgramHandle>,
    fallback: bool,
    blur_scale: Option<f32>,
    seed: f32,
}

impl Composition {
    /// Compiles the planned program, dropping to the cross-fade program if it
    /// fails. Never fails itself: without a program the run is timing-only.
    pub fn build(
        renderer: &mut Renderer,
        library: &ShaderLibrary,
        config: &TransitionConfig,
        plan: &ProgramPlan,
        seed: f32,
    ) -> Self {
        let timing_only = Self {
            program: None,
            fallback: false,
            blur_scale: None,
            seed,
        };
        match config.gpu_mode {
            GpuMode::Disabled => {
                tracing::debug!("GPU mode disabled; running timing only");
                return timing_only;
            }
            GpuMode::Force if !renderer.is_gpu_enabled() => {
                tracing::warn!("GPU rendering was forced but no GPU context is available");
                return timing_only;
            }
            _ if !renderer.is_gpu_enabled() => return timing_only,
            _ => {}
        }

        let source = ProgramSource {
            vertex: plan.vertex,
            fragment: &plan.fragment,
            uniforms: plan.uniforms,
            custom: &plan.custom,
        };
        let (program, fallback) = match renderer.compile_shader_program(&plan.key, &source) {
            Some(handle) => (Some(handle), false),
            None => {
                tracing::warn!(
                    program = %plan.key,
                    "shader program unavailable; using the cross-fade program"
                );
                (compile_fallback(renderer, library), true)
            }
        };

        let blur_scale = match config.kind {
            TransitionKind::Blur(_) if !fallback => config.performance_tier.intermediate_scale(),
            _ => None,
        };
        Self {
            program,
            fallback,
            blur_scale,
            seed,
        }
    }

    pub fn draws_pixels(&self) -> bool {
        self.program.is_some()
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Uploads the frame's surfaces, draws and presents. Returns `false` when
    /// nothing was drawn.
    pub fn render(
        &self,
        renderer: &mut Renderer,
        config: &TransitionConfig,
        progress: f32,
        frame: Option<&FrameInput<'_>>,
    ) -> bool {
        let Some(program) = self.program.as_ref() else {
            return false;
        };
        if let Some(frame) = frame {
            renderer.create_or_update_texture(FROM_TEXTURE, &frame.from);
            renderer.create_or_update_texture(TO_TEXTURE, &frame.to);
        }

        let uniforms = if self.fallback {
            vec![(names::PROGRESS, UniformValue::Float(progress))]
        } else {
            family_uniforms(&config.kind, progress, self.seed)
        };

        let drawn = match (self.blur_scale, &config.kind) {
            (Some(scale), TransitionKind::Blur(params)) => {
                let (width, height) = renderer.size();
                let scaled = |value: u32| ((value as f32 * scale).round() as u32).max(1);
                if !renderer.create_framebuffer(BLUR_TARGET, scaled(width), scaled(height)) {
                    return false;
                }
                let mut horizontal = uniforms.clone();
                horizontal.push((names::MODE, UniformValue::Float(0.0)));
                horizontal.push((names::INTENSITY, UniformValue::Float(params.radius * scale)));
                let mut vertical = uniforms;
                vertical.push((names::MODE, UniformValue::Float(1.0)));

                draw_pass(renderer, program, Some(BLUR_TARGET), &horizontal, (FROM_TEXTURE, TO_TEXTURE))
                    && draw_pass(renderer, program, None, &vertical, (BLUR_TARGET, BLUR_TARGET))
            }
            _ => draw_pass(renderer, program, None, &uniforms, (FROM_TEXTURE, TO_TEXTURE)),
        };
        drawn && renderer.present()
    }
}

fn compile_fallback(renderer: &mut Renderer, library: &ShaderLibrary) -> Option<ProgramHandle> {
    let definition = library.fallback()?;
    let fragment = definition.fragment_source();
    let handle = renderer.compile_shader_program(
        definition.family.key(),
        &ProgramSource::from_definition(definition, &fragment),
    );
    if handle.is_none() {
        tracing::warn!("cross-fade program unavailable; frames will not be drawn");
    }
    handle
}

fn draw_pass(
    renderer: &mut Renderer,
    program: &ProgramHandle,
    target: Option<&str>,
    uniforms: &[(&str, UniformValue)],
    (from, to): (&str, &str),
) -> bool {
    if !renderer.bind_framebuffer(target) || !renderer.use_program(program) {
        return false;
    }
    for (name, value) in uniforms {
        if !renderer.set_uniform(name, *value) {
            tracing::trace!(program = program.key(), uniform = *name, "uniform not accepted");
        }
    }
    renderer.bind_texture(TextureSlot::From, from);
    renderer.bind_texture(TextureSlot::To, to);
    renderer.draw_fullscreen_quad()
}

fn float(name: &str, value: f32) -> (&str, UniformValue) {
    (name, UniformValue::Float(value))
}

fn vec2(name: &str, value: [f32; 2]) -> (&str, UniformValue) {
    (name, UniformValue::Vec2(value))
}

/// Uniform values for one frame of `kind`. `progress` is already eased.
pub(crate) fn family_uniforms(
    kind: &TransitionKind,
    progress: f32,
    seed: f32,
) -> Vec<(&str, UniformValue)> {
    let mut values = vec![float(names::PROGRESS, progress)];
    match kind {
        TransitionKind::Fade(params) => {
            let (mode, rgb) = match params.fade_type {
                FadeType::Black => (0.0, [0.0; 3]),
                FadeType::White => (0.0, [1.0; 3]),
                FadeType::Cross => (1.0, [0.0; 3]),
                FadeType::Transparent => (2.0, [0.0; 3]),
            };
            values.push(float(names::MODE, mode));
            values.push((
                names::COLOR,
                UniformValue::Vec4([rgb[0], rgb[1], rgb[2], params.overlay_opacity]),
            ));
        }
        TransitionKind::Slide(params) => {
            let speed = if params.parallax {
                (1.0 - params.parallax_intensity).max(0.0)
            } else {
                1.0
            };
            values.push(vec2(names::DIRECTION, params.direction.vector()));
            values.push(float(names::SCALE, speed));
            values.push(float(names::SOFTNESS, params.overlap));
        }
        TransitionKind::Zoom(params) => {
            let mode = match params.zoom_type {
                ZoomType::In => 0.0,
                ZoomType::Out => 1.0,
                ZoomType::Pulsar => 2.0,
            };
            values.push(float(names::MODE, mode));
            values.push(vec2(names::ORIGIN, params.origin));
            values.push(float(names::INTENSITY, params.intensity));
            values.push(float(
                names::ROTATION,
                params.rotation.unwrap_or(0.0).to_radians(),
            ));
        }
        TransitionKind::Wipe(params) => {
            let direction = params.effective_direction().vector();
            values.push(float(names::SOFTNESS, params.softness));
            match params.wipe_type {
                WipeType::Radial => {
                    let winding = if params.clockwise { 1.0 } else { -1.0 };
                    values.push(vec2(names::ORIGIN, [0.5, 0.5]));
                    values.push(vec2(names::DIRECTION, [winding, 0.0]));
                    values.push(float(names::ROTATION, direction[1].atan2(direction[0])));
                }
                WipeType::Gradient => {
                    values.push(float(names::MODE, 1.0));
                    values.push(vec2(names::DIRECTION, direction));
                }
                WipeType::Linear | WipeType::Diagonal => {
                    values.push(float(names::MODE, 0.0));
                    values.push(vec2(names::DIRECTION, direction));
                }
            }
        }
        TransitionKind::Glitch(params) => {
            let mode = match params.glitch_type {
                GlitchType::RgbSplit => 0.0,
                GlitchType::Noise => 1.0,
                GlitchType::Chromatic => 2.0,
                GlitchType::Digital => 3.0,
            };
            values.push(float(names::MODE, mode));
            values.push(float(names::INTENSITY, params.intensity));
            values.push(float(names::BLOCK_COUNT, params.block_count as f32));
            values.push(vec2(names::RGB_OFFSET, params.rgb_offset));
            values.push(float(names::SEED, seed));
        }
        TransitionKind::Blur(params) => {
            values.push(float(names::MODE, 0.0));
            values.push(float(names::INTENSITY, params.radius));
        }
        TransitionKind::Dissolve(params) => {
            values.push(float(names::BLOCK_COUNT, params.cell_size));
            values.push(float(names::SOFTNESS, params.softness));
            values.push(float(names::SEED, seed));
        }
        TransitionKind::Custom(params) => {
            values.extend(
                params
                    .uniforms
                    .iter()
                    .map(|(name, value)| (name.as_str(), *value)),
            );
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use presetconfig::{
        BlurParams, Direction, FadeParams, GlitchParams, SlideParams, WipeParams, ZoomParams,
    };

    use super::*;

    fn lookup<'a>(values: &'a [(&str, UniformValue)], name: &str) -> Option<&'a UniformValue> {
        values.iter().rev().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    fn config(kind: TransitionKind) -> TransitionConfig {
        TransitionConfig::new(kind, Duration::from_millis(500))
    }

    #[test]
    fn fade_white_carries_colour_and_opacity() {
        let kind = TransitionKind::Fade(FadeParams {
            fade_type: FadeType::White,
            overlay_opacity: 0.4,
        });
        let values = family_uniforms(&kind, 0.3, 0.0);
        assert_eq!(lookup(&values, names::PROGRESS), Some(&UniformValue::Float(0.3)));
        assert_eq!(lookup(&values, names::MODE), Some(&UniformValue::Float(0.0)));
        assert_eq!(
            lookup(&values, names::COLOR),
            Some(&UniformValue::Vec4([1.0, 1.0, 1.0, 0.4]))
        );
    }

    #[test]
    fn slide_parallax_slows_the_outgoing_surface() {
        let kind = TransitionKind::Slide(SlideParams {
            direction: Direction::Left,
            parallax: true,
            parallax_intensity: 0.25,
            ..SlideParams::default()
        });
        let values = family_uniforms(&kind, 0.5, 0.0);
        assert_eq!(
            lookup(&values, names::DIRECTION),
            Some(&UniformValue::Vec2([-1.0, 0.0]))
        );
        assert_eq!(lookup(&values, names::SCALE), Some(&UniformValue::Float(0.75)));
    }

    #[test]
    fn zoom_rotation_is_sent_in_radians() {
        let kind = TransitionKind::Zoom(ZoomParams {
            zoom_type: ZoomType::Pulsar,
            rotation: Some(180.0),
            ..ZoomParams::default()
        });
        let values = family_uniforms(&kind, 0.5, 0.0);
        assert_eq!(lookup(&values, names::MODE), Some(&UniformValue::Float(2.0)));
        match lookup(&values, names::ROTATION) {
            Some(UniformValue::Float(angle)) => {
                assert!((angle - std::f32::consts::PI).abs() < 1e-5)
            }
            other => panic!("unexpected rotation {other:?}"),
        }
    }

    #[test]
    fn radial_wipe_uses_its_own_program_and_winding() {
        let kind = TransitionKind::Wipe(WipeParams {
            wipe_type: WipeType::Radial,
            direction: Direction::Up,
            clockwise: false,
            ..WipeParams::default()
        });
        assert_eq!(shader_family(&kind), Some(ShaderFamily::RadialWipe));
        let values = family_uniforms(&kind, 0.5, 0.0);
        assert_eq!(
            lookup(&values, names::DIRECTION),
            Some(&UniformValue::Vec2([-1.0, 0.0]))
        );
        match lookup(&values, names::ROTATION) {
            Some(UniformValue::Float(angle)) => {
                assert!((angle + std::f32::consts::FRAC_PI_2).abs() < 1e-5)
            }
            other => panic!("unexpected rotation {other:?}"),
        }
    }

    #[test]
    fn glitch_passes_seed_and_block_count() {
        let kind = TransitionKind::Glitch(GlitchParams {
            glitch_type: GlitchType::Digital,
            block_count: 20,
            ..GlitchParams::default()
        });
        let values = family_uniforms(&kind, 0.1, 7.5);
        assert_eq!(lookup(&values, names::MODE), Some(&UniformValue::Float(3.0)));
        assert_eq!(lookup(&values, names::BLOCK_COUNT), Some(&UniformValue::Float(20.0)));
        assert_eq!(lookup(&values, names::SEED), Some(&UniformValue::Float(7.5)));
    }

    #[test]
    fn custom_uniforms_pass_through_by_name() {
        let mut params = CustomParams {
            shader: "ripple".into(),
            ..CustomParams::default()
        };
        params.uniforms.insert("amplitude".into(), UniformValue::Float(0.2));
        let kind = TransitionKind::Custom(params);
        let values = family_uniforms(&kind, 0.5, 0.0);
        assert_eq!(lookup(&values, "amplitude"), Some(&UniformValue::Float(0.2)));
    }

    #[test]
    fn builtin_plans_use_family_keys() {
        let library = ShaderLibrary::builtin();
        let plan = ProgramPlan::resolve(
            &config(TransitionKind::Blur(BlurParams::default())),
            &library,
            None,
        )
        .unwrap();
        assert_eq!(plan.key, "blur");
        assert!(plan.fragment.contains("vec4 transition"));
    }

    #[test]
    fn custom_plans_need_a_source() {
        let library = ShaderLibrary::builtin();
        let custom = config(TransitionKind::Custom(CustomParams {
            shader: "ripple".into(),
            ..CustomParams::default()
        }));
        assert!(matches!(
            ProgramPlan::resolve(&custom, &library, None),
            Err(ConfigError::UnknownCustomShader(_))
        ));

        let body = "vec4 transition(vec2 uv) { return getToColor(uv); }";
        let first = ProgramPlan::resolve(&custom, &library, Some(body)).unwrap();
        let other = "vec4 transition(vec2 uv) { return getFromColor(uv); }";
        let second = ProgramPlan::resolve(&custom, &library, Some(other)).unwrap();
        assert!(first.key.starts_with("custom:ripple:"));
        assert_ne!(first.key, second.key);
    }

    #[test]
    fn disabled_renderer_gives_a_timing_only_composition() {
        let library = ShaderLibrary::builtin();
        let config = config(TransitionKind::Blur(BlurParams::default()));
        let plan = ProgramPlan::resolve(&config, &library, None).unwrap();
        let mut renderer = Renderer::disabled(64, 64);
        let composition = Composition::build(&mut renderer, &library, &config, &plan, 1.0);
        assert!(!composition.draws_pixels());
        assert!(!composition.render(&mut renderer, &config, 0.5, None));
    }
}
