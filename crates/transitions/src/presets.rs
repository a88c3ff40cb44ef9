use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use presetconfig::{
    BlurParams, ConfigError, Direction, DissolveParams, Easing, EasingCurve, FadeParams, FadeType,
    GlitchParams, GlitchType, PresetEntry, PresetFile, SlideParams, TransitionConfig,
    TransitionFamily, TransitionKind, WipeParams, WipeType, ZoomParams, ZoomType,
};

/// Catalog entry. Shares its schema with `[[preset]]` tables in preset files.
pub type TransitionPreset = PresetEntry;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("preset id '{0}' belongs to a built-in preset")]
    BuiltinConflict(String),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Built-in presets plus caller-registered ones.
///
/// Built-ins are fixed at construction. Custom presets live in a separate
/// map, so removing one can never disturb a built-in.
#[derive(Clone, Debug)]
pub struct PresetCatalog {
    builtin: Vec<TransitionPreset>,
    builtin_index: HashMap<String, usize>,
    custom: BTreeMap<String, TransitionPreset>,
}

impl PresetCatalog {
    pub fn builtin() -> Self {
        let builtin = builtin_presets();
        let builtin_index = builtin
            .iter()
            .enumerate()
            .map(|(index, preset)| (preset.id.clone(), index))
            .collect();
        Self {
            builtin,
            builtin_index,
            custom: BTreeMap::new(),
        }
    }

    /// A catalog without built-ins, for callers that ship their own.
    pub fn empty() -> Self {
        Self {
            builtin: Vec::new(),
            builtin_index: HashMap::new(),
            custom: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TransitionPreset> {
        self.builtin_index
            .get(id)
            .and_then(|index| self.builtin.get(*index))
            .or_else(|| self.custom.get(id))
    }

    /// Built-ins in definition order, then custom presets by id.
    pub fn all(&self) -> Vec<&TransitionPreset> {
        self.builtin.iter().chain(self.custom.values()).collect()
    }

    pub fn by_category(&self, category: TransitionFamily) -> Vec<&TransitionPreset> {
        self.all()
            .into_iter()
            .filter(|preset| preset.category == category)
            .collect()
    }

    pub fn is_builtin(&self, id: &str) -> bool {
        self.builtin_index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.builtin.len() + self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validates and stores a custom preset, returning the custom preset it
    /// replaced.
    pub fn add_custom(
        &mut self,
        preset: TransitionPreset,
    ) -> Result<Option<TransitionPreset>, PresetError> {
        if self.is_builtin(&preset.id) {
            return Err(PresetError::BuiltinConflict(preset.id));
        }
        preset.validate()?;
        tracing::debug!(preset = %preset.id, category = %preset.category, "registered custom preset");
        Ok(self.custom.insert(preset.id.clone(), preset))
    }

    /// Removes a custom preset. Built-ins cannot be removed.
    pub fn remove(&mut self, id: &str) -> Option<TransitionPreset> {
        if self.is_builtin(id) {
            tracing::warn!(preset = id, "built-in presets cannot be removed");
            return None;
        }
        self.custom.remove(id)
    }

    /// Registers every preset of a loaded file. Stops at the first failure;
    /// presets added before it stay registered.
    pub fn load_file(&mut self, file: PresetFile) -> Result<usize, PresetError> {
        let count = file.presets.len();
        for preset in file.presets {
            self.add_custom(preset)?;
        }
        Ok(count)
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn preset(
    id: &str,
    name: &str,
    description: &str,
    tags: &[&str],
    performance_rating: u8,
    config: TransitionConfig,
) -> TransitionPreset {
    TransitionPreset {
        id: id.to_string(),
        name: name.to_string(),
        category: config.family(),
        description: description.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        gpu_supported: true,
        performance_rating,
        config,
    }
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn fade(fade_type: FadeType, ms: u64) -> TransitionConfig {
    TransitionConfig::new(
        TransitionKind::Fade(FadeParams {
            fade_type,
            ..FadeParams::default()
        }),
        millis(ms),
    )
    .with_easing(EasingCurve::EaseInOut)
}

fn slide(direction: Direction) -> TransitionConfig {
    TransitionConfig::new(
        TransitionKind::Slide(SlideParams {
            direction,
            ..SlideParams::default()
        }),
        millis(600),
    )
    .with_easing(EasingCurve::EaseOut)
}

fn zoom(zoom_type: ZoomType, ms: u64) -> TransitionConfig {
    TransitionConfig::new(
        TransitionKind::Zoom(ZoomParams {
            zoom_type,
            ..ZoomParams::default()
        }),
        millis(ms),
    )
    .with_easing(EasingCurve::EaseInOut)
}

fn wipe(wipe_type: WipeType, direction: Direction) -> TransitionConfig {
    TransitionConfig::new(
        TransitionKind::Wipe(WipeParams {
            wipe_type,
            direction,
            ..WipeParams::default()
        }),
        millis(800),
    )
    .with_easing(EasingCurve::EaseInOut)
}

fn glitch(glitch_type: GlitchType, intensity: f32) -> TransitionConfig {
    TransitionConfig::new(
        TransitionKind::Glitch(GlitchParams {
            glitch_type,
            intensity,
            ..GlitchParams::default()
        }),
        millis(400),
    )
}

fn builtin_presets() -> Vec<TransitionPreset> {
    vec![
        preset(
            "fade-black",
            "Fade through black",
            "Darkens the outgoing frame before revealing the next one.",
            &["classic", "fade"],
            5,
            fade(FadeType::Black, 1000),
        ),
        preset(
            "fade-white",
            "Fade through white",
            "Flashes to white between frames.",
            &["classic", "fade", "bright"],
            5,
            fade(FadeType::White, 1000),
        ),
        preset(
            "crossfade",
            "Cross dissolve",
            "Blends straight from one frame to the next.",
            &["classic", "subtle"],
            5,
            fade(FadeType::Cross, 750).with_easing(EasingCurve::Linear),
        ),
        preset(
            "fade-transparent",
            "Fade through transparency",
            "Fades the outgoing frame out before the next fades in.",
            &["fade", "overlay"],
            5,
            fade(FadeType::Transparent, 1000),
        ),
        preset(
            "slide-left",
            "Slide left",
            "Pushes the next frame in from the right.",
            &["slide", "motion"],
            4,
            slide(Direction::Left),
        ),
        preset(
            "slide-right",
            "Slide right",
            "Pushes the next frame in from the left.",
            &["slide", "motion"],
            4,
            slide(Direction::Right),
        ),
        preset(
            "slide-up",
            "Slide up",
            "Pushes the next frame in from below.",
            &["slide", "motion"],
            4,
            slide(Direction::Up),
        ),
        preset(
            "slide-down",
            "Slide down",
            "Pushes the next frame in from above.",
            &["slide", "motion"],
            4,
            slide(Direction::Down),
        ),
        preset(
            "slide-parallax",
            "Parallax slide",
            "Slides left with the outgoing frame trailing behind.",
            &["slide", "motion", "depth"],
            4,
            TransitionConfig::new(
                TransitionKind::Slide(SlideParams {
                    direction: Direction::Left,
                    overlap: 0.1,
                    parallax: true,
                    parallax_intensity: 0.5,
                }),
                millis(800),
            )
            .with_easing(Easing::cubic_bezier(0.25, 0.1, 0.25, 1.0)),
        ),
        preset(
            "zoom-in",
            "Zoom in",
            "Scales into the outgoing frame while the next one fades in.",
            &["zoom", "motion"],
            4,
            zoom(ZoomType::In, 800),
        ),
        preset(
            "zoom-out",
            "Zoom out",
            "Pulls back from the outgoing frame.",
            &["zoom", "motion"],
            4,
            zoom(ZoomType::Out, 800),
        ),
        preset(
            "zoom-pulsar",
            "Pulsar",
            "Swells and contracts around the centre.",
            &["zoom", "energetic"],
            4,
            zoom(ZoomType::Pulsar, 1000),
        ),
        preset(
            "zoom-spin",
            "Spin zoom",
            "Zooms in while rotating half a turn.",
            &["zoom", "energetic"],
            3,
            TransitionConfig::new(
                TransitionKind::Zoom(ZoomParams {
                    zoom_type: ZoomType::In,
                    intensity: 1.5,
                    rotation: Some(180.0),
                    ..ZoomParams::default()
                }),
                millis(900),
            )
            .with_easing(EasingCurve::EaseIn),
        ),
        preset(
            "wipe-linear",
            "Linear wipe",
            "A straight edge sweeps across the frame.",
            &["wipe", "classic"],
            5,
            wipe(WipeType::Linear, Direction::Right),
        ),
        preset(
            "wipe-radial",
            "Clock wipe",
            "Sweeps around the centre like a clock hand.",
            &["wipe", "radial"],
            5,
            wipe(WipeType::Radial, Direction::Up),
        ),
        preset(
            "wipe-diagonal",
            "Diagonal wipe",
            "A straight edge sweeps corner to corner.",
            &["wipe"],
            5,
            wipe(WipeType::Diagonal, Direction::Right),
        ),
        preset(
            "wipe-gradient",
            "Luma wipe",
            "Reveals the next frame from its darkest areas to its brightest.",
            &["wipe", "organic"],
            4,
            wipe(WipeType::Gradient, Direction::Right),
        ),
        preset(
            "glitch-rgb",
            "RGB split",
            "Tears the colour channels apart before snapping to the next frame.",
            &["glitch", "energetic"],
            3,
            glitch(GlitchType::RgbSplit, 0.6),
        ),
        preset(
            "glitch-digital",
            "Digital glitch",
            "Quantised block displacement.",
            &["glitch", "energetic"],
            3,
            glitch(GlitchType::Digital, 0.8),
        ),
        preset(
            "glitch-noise",
            "Static",
            "Channel split with analogue grain.",
            &["glitch", "retro"],
            3,
            glitch(GlitchType::Noise, 0.7),
        ),
        preset(
            "glitch-chromatic",
            "Chromatic aberration",
            "Channels drift outward from the centre.",
            &["glitch", "lens"],
            3,
            glitch(GlitchType::Chromatic, 0.6),
        ),
        preset(
            "blur-soft",
            "Soft blur",
            "Blurs out, swaps frames, and sharpens back in.",
            &["blur", "subtle"],
            2,
            TransitionConfig::new(TransitionKind::Blur(BlurParams::default()), millis(900))
                .with_easing(EasingCurve::Smoothstep),
        ),
        preset(
            "dissolve-pixel",
            "Pixel dissolve",
            "Reveals the next frame in random cells.",
            &["dissolve", "retro"],
            4,
            TransitionConfig::new(
                TransitionKind::Dissolve(DissolveParams {
                    cell_size: 8.0,
                    ..DissolveParams::default()
                }),
                millis(800),
            ),
        ),
    ]
}
