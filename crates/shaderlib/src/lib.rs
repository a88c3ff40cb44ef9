//! Static catalog of the GLSL programs used by the transition engine.
//!
//! The library is plain data: one shared vertex stage, one fragment body per
//! transition family and the uniform schema each body reads. Programs are
//! assembled and compiled by the `renderer` crate; nothing here touches a GPU.
//!
//! ```text
//!   ShaderLibrary::builtin()
//!          │ ShaderDefinition { vertex, body, uniforms }
//!          ▼
//!   fragment_source() = PRELUDE + body + FOOTER ──▶ Renderer::compile_shader_program
//! ```

mod custom;
mod sources;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use custom::{wrap_custom_fragment, CustomUniform, WrapError, MAX_CUSTOM_UNIFORMS};
pub use sources::{FOOTER, PRELUDE, QUAD_VERTEX};

/// Names of the uniforms declared by [`PRELUDE`].
pub mod names {
    pub const RESOLUTION: &str = "u_resolution";
    pub const PROGRESS: &str = "u_progress";
    pub const INTENSITY: &str = "u_intensity";
    pub const DIRECTION: &str = "u_direction";
    pub const ORIGIN: &str = "u_origin";
    pub const COLOR: &str = "u_color";
    pub const RGB_OFFSET: &str = "u_rgb_offset";
    pub const BLOCK_COUNT: &str = "u_block_count";
    pub const SOFTNESS: &str = "u_softness";
    pub const SCALE: &str = "u_scale";
    pub const ROTATION: &str = "u_rotation";
    pub const MODE: &str = "u_mode";
    pub const SEED: &str = "u_seed";
}

/// Vertex attributes consumed by [`QUAD_VERTEX`].
pub const QUAD_ATTRIBUTES: &[&str] = &["a_position"];

/// One program per visual rule. Several configuration families can map onto
/// the same program (for instance linear and diagonal wipes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderFamily {
    Crossfade,
    Fade,
    Slide,
    Zoom,
    Wipe,
    RadialWipe,
    Glitch,
    Blur,
    Dissolve,
}

impl ShaderFamily {
    pub const ALL: [ShaderFamily; 9] = [
        ShaderFamily::Crossfade,
        ShaderFamily::Fade,
        ShaderFamily::Slide,
        ShaderFamily::Zoom,
        ShaderFamily::Wipe,
        ShaderFamily::RadialWipe,
        ShaderFamily::Glitch,
        ShaderFamily::Blur,
        ShaderFamily::Dissolve,
    ];

    /// Stable identifier, also used as the renderer program cache key.
    pub fn key(self) -> &'static str {
        match self {
            ShaderFamily::Crossfade => "crossfade",
            ShaderFamily::Fade => "fade",
            ShaderFamily::Slide => "slide",
            ShaderFamily::Zoom => "zoom",
            ShaderFamily::Wipe => "wipe",
            ShaderFamily::RadialWipe => "radial-wipe",
            ShaderFamily::Glitch => "glitch",
            ShaderFamily::Blur => "blur",
            ShaderFamily::Dissolve => "dissolve",
        }
    }
}

impl fmt::Display for ShaderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
        }
    }
}

/// A value supplied for a uniform. Serialized as a bare number or an array of
/// two to four numbers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
        }
    }

    /// Widens the value to a `vec4`, zero-filling the unused lanes.
    pub fn to_vec4(&self) -> [f32; 4] {
        match *self {
            UniformValue::Float(x) => [x, 0.0, 0.0, 0.0],
            UniformValue::Vec2([x, y]) => [x, y, 0.0, 0.0],
            UniformValue::Vec3([x, y, z]) => [x, y, z, 0.0],
            UniformValue::Vec4(v) => v,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_vec4().iter().all(|lane| lane.is_finite())
    }
}

/// Declared uniform of a program: name, type and the value used when the
/// caller never sets it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
    pub default: UniformValue,
}

const fn float(name: &'static str, default: f32) -> UniformDecl {
    UniformDecl {
        name,
        kind: UniformKind::Float,
        default: UniformValue::Float(default),
    }
}

const fn vec2(name: &'static str, default: [f32; 2]) -> UniformDecl {
    UniformDecl {
        name,
        kind: UniformKind::Vec2,
        default: UniformValue::Vec2(default),
    }
}

const fn vec4(name: &'static str, default: [f32; 4]) -> UniformDecl {
    UniformDecl {
        name,
        kind: UniformKind::Vec4,
        default: UniformValue::Vec4(default),
    }
}

const COMMON: [UniformDecl; 2] = [
    float(names::PROGRESS, 0.0),
    vec2(names::RESOLUTION, [1.0, 1.0]),
];

const CROSSFADE_UNIFORMS: &[UniformDecl] = &COMMON;

const FADE_UNIFORMS: &[UniformDecl] = &[
    COMMON[0],
    COMMON[1],
    float(names::MODE, 0.0),
    vec4(names::COLOR, [0.0, 0.0, 0.0, 1.0]),
];

const SLIDE_UNIFORMS: &[UniformDecl] = &[
    COMMON[0],
    COMMON[1],
    vec2(names::DIRECTION, [-1.0, 0.0]),
    float(names::SCALE, 1.0),
    float(names::SOFTNESS, 0.0),
];

const ZOOM_UNIFORMS: &[UniformDecl] = &[
    COMMON[0],
    COMMON[1],
    float(names::MODE, 0.0),
    vec2(names::ORIGIN, [0.5, 0.5]),
    float(names::INTENSITY, 1.0),
    float(names::ROTATION, 0.0),
];

const WIPE_UNIFORMS: &[UniformDecl] = &[
    COMMON[0],
    COMMON[1],
    float(names::MODE, 0.0),
    vec2(names::DIRECTION, [1.0, 0.0]),
    float(names::SOFTNESS, 0.05),
];

const RADIAL_WIPE_UNIFORMS: &[UniformDecl] = &[
    COMMON[0],
    COMMON[1],
    vec2(names::ORIGIN, [0.5, 0.5]),
    vec2(names::DIRECTION, [1.0, 0.0]),
    float(names::ROTATION, 0.0),
    float(names::SOFTNESS, 0.05),
];

const GLITCH_UNIFORMS: &[UniformDecl] = &[
    COMMON[0],
    COMMON[1],
    float(names::MODE, 0.0),
    float(names::INTENSITY, 1.0),
    float(names::BLOCK_COUNT, 12.0),
    vec2(names::RGB_OFFSET, [12.0, 0.0]),
    float(names::SEED, 0.0),
];

const BLUR_UNIFORMS: &[UniformDecl] = &[
    COMMON[0],
    COMMON[1],
    float(names::MODE, 0.0),
    float(names::INTENSITY, 24.0),
];

const DISSOLVE_UNIFORMS: &[UniformDecl] = &[
    COMMON[0],
    COMMON[1],
    float(names::BLOCK_COUNT, 1.0),
    float(names::SOFTNESS, 0.1),
    float(names::SEED, 0.0),
];

/// Source pair and uniform schema for one family.
#[derive(Clone, Debug)]
pub struct ShaderDefinition {
    pub family: ShaderFamily,
    pub vertex: &'static str,
    pub body: &'static str,
    pub uniforms: &'static [UniformDecl],
    pub attributes: &'static [&'static str],
}

impl ShaderDefinition {
    const fn builtin(
        family: ShaderFamily,
        body: &'static str,
        uniforms: &'static [UniformDecl],
    ) -> Self {
        Self {
            family,
            vertex: QUAD_VERTEX,
            body,
            uniforms,
            attributes: QUAD_ATTRIBUTES,
        }
    }

    /// Complete fragment stage: prelude, family body and entry point.
    pub fn fragment_source(&self) -> String {
        format!("{PRELUDE}\n{body}\n{FOOTER}", body = self.body)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformDecl> {
        self.uniforms.iter().find(|decl| decl.name == name)
    }
}

/// Family-to-program catalog. Constructed explicitly and handed to whoever
/// needs it, so several engines in one process stay independent.
#[derive(Clone, Debug)]
pub struct ShaderLibrary {
    definitions: HashMap<ShaderFamily, ShaderDefinition>,
}

impl ShaderLibrary {
    /// The built-in programs, one per [`ShaderFamily`].
    pub fn builtin() -> Self {
        let definitions = [
            ShaderDefinition::builtin(ShaderFamily::Crossfade, sources::CROSSFADE, CROSSFADE_UNIFORMS),
            ShaderDefinition::builtin(ShaderFamily::Fade, sources::FADE, FADE_UNIFORMS),
            ShaderDefinition::builtin(ShaderFamily::Slide, sources::SLIDE, SLIDE_UNIFORMS),
            ShaderDefinition::builtin(ShaderFamily::Zoom, sources::ZOOM, ZOOM_UNIFORMS),
            ShaderDefinition::builtin(ShaderFamily::Wipe, sources::WIPE, WIPE_UNIFORMS),
            ShaderDefinition::builtin(
                ShaderFamily::RadialWipe,
                sources::RADIAL_WIPE,
                RADIAL_WIPE_UNIFORMS,
            ),
            ShaderDefinition::builtin(ShaderFamily::Glitch, sources::GLITCH, GLITCH_UNIFORMS),
            ShaderDefinition::builtin(ShaderFamily::Blur, sources::BLUR, BLUR_UNIFORMS),
            ShaderDefinition::builtin(ShaderFamily::Dissolve, sources::DISSOLVE, DISSOLVE_UNIFORMS),
        ]
        .into_iter()
        .map(|definition| (definition.family, definition))
        .collect();
        Self { definitions }
    }

    /// Replaces the program used for `definition.family`.
    pub fn with_definition(mut self, definition: ShaderDefinition) -> Self {
        self.definitions.insert(definition.family, definition);
        self
    }

    pub fn get(&self, family: ShaderFamily) -> Option<&ShaderDefinition> {
        self.definitions.get(&family)
    }

    pub fn fallback(&self) -> Option<&ShaderDefinition> {
        self.get(ShaderFamily::Crossfade)
    }

    pub fn vertex_source(&self) -> &'static str {
        QUAD_VERTEX
    }

    pub fn families(&self) -> impl Iterator<Item = ShaderFamily> + '_ {
        let mut families: Vec<_> = self.definitions.keys().copied().collect();
        families.sort();
        families.into_iter()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_library_covers_every_family() {
        let library = ShaderLibrary::builtin();
        for family in ShaderFamily::ALL {
            let definition = library.get(family).expect("definition");
            assert_eq!(definition.family, family);
            assert_eq!(definition.vertex, QUAD_VERTEX);
            assert!(definition.body.contains("vec4 transition(vec2 uv)"));
        }
        assert_eq!(library.families().count(), ShaderFamily::ALL.len());
    }

    #[test]
    fn every_program_declares_progress_and_resolution() {
        let library = ShaderLibrary::builtin();
        for family in ShaderFamily::ALL {
            let definition = library.get(family).unwrap();
            assert!(definition.uniform(names::PROGRESS).is_some(), "{family}");
            assert!(definition.uniform(names::RESOLUTION).is_some(), "{family}");
        }
    }

    #[test]
    fn declared_uniforms_are_referenced_by_the_body() {
        let library = ShaderLibrary::builtin();
        for family in ShaderFamily::ALL {
            let definition = library.get(family).unwrap();
            for decl in definition.uniforms {
                if decl.name == names::RESOLUTION {
                    continue;
                }
                assert!(
                    definition.body.contains(decl.name),
                    "{family} declares {} but never reads it",
                    decl.name
                );
            }
        }
    }

    #[test]
    fn fragment_source_wraps_body() {
        let library = ShaderLibrary::builtin();
        let source = library.get(ShaderFamily::Fade).unwrap().fragment_source();
        assert!(source.starts_with("#version 450"));
        assert!(source.contains("uniform TransitionParams"));
        assert!(source.contains("outColor = transition(v_uv);"));
        assert_eq!(source.matches("#version").count(), 1);
    }

    #[test]
    fn overriding_a_definition_keeps_the_rest() {
        let custom = ShaderDefinition {
            family: ShaderFamily::Fade,
            vertex: QUAD_VERTEX,
            body: "vec4 transition(vec2 uv) { return getToColor(uv); }",
            uniforms: &COMMON,
            attributes: QUAD_ATTRIBUTES,
        };
        let library = ShaderLibrary::builtin().with_definition(custom);
        assert!(library
            .get(ShaderFamily::Fade)
            .unwrap()
            .body
            .contains("getToColor(uv); }"));
        assert!(library.fallback().is_some());
    }

    #[test]
    fn uniform_values_deserialize_from_numbers_and_arrays() {
        let value: UniformValue = serde_json::from_str("0.5").unwrap();
        assert_eq!(value, UniformValue::Float(0.5));
        let value: UniformValue = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(value.kind(), UniformKind::Vec2);
        let value: UniformValue = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(value.to_vec4(), [1.0, 2.0, 3.0, 4.0]);
    }
}
