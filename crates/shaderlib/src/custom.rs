use crate::{UniformKind, FOOTER, PRELUDE};

/// Number of `vec4` slots reserved in the uniform block for caller uniforms.
pub const MAX_CUSTOM_UNIFORMS: usize = 8;

/// Identifiers the prelude already owns.
const RESERVED: &[&str] = &[
    "ubo",
    "progress",
    "ratio",
    "PI",
    "outColor",
    "v_uv",
    "transition",
    "getFromColor",
    "getToColor",
    "insideUnit",
    "hash12",
];

/// A caller uniform and the slot it occupies, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomUniform {
    pub name: String,
    pub kind: UniformKind,
}

impl CustomUniform {
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WrapError {
    #[error("custom shader must define `vec4 transition(vec2 uv)`")]
    MissingEntryPoint,
    #[error(
        "custom shader declares {0} uniforms; at most {max} are supported",
        max = MAX_CUSTOM_UNIFORMS
    )]
    TooManyUniforms(usize),
    #[error("'{0}' is not a valid uniform identifier")]
    InvalidUniformName(String),
    #[error("uniform name '{0}' is reserved by the transition prelude")]
    ReservedUniformName(String),
}

/// Produces a complete fragment stage from a caller-supplied transition body.
///
/// Steps performed:
///
/// 1. Strip `#version` directives and `uniform` declarations; caller uniforms
///    are remapped onto the reserved `_custom` slots instead.
/// 2. Prepend [`PRELUDE`] plus one `#define` per caller uniform.
/// 3. Append [`FOOTER`], which calls `transition(v_uv)`.
pub fn wrap_custom_fragment(source: &str, uniforms: &[CustomUniform]) -> Result<String, WrapError> {
    if !source.contains("transition(") {
        return Err(WrapError::MissingEntryPoint);
    }
    if uniforms.len() > MAX_CUSTOM_UNIFORMS {
        return Err(WrapError::TooManyUniforms(uniforms.len()));
    }

    let mut defines = String::new();
    for (slot, uniform) in uniforms.iter().enumerate() {
        validate_name(&uniform.name)?;
        let swizzle = match uniform.kind {
            UniformKind::Float => ".x",
            UniformKind::Vec2 => ".xy",
            UniformKind::Vec3 => ".xyz",
            UniformKind::Vec4 => "",
        };
        defines.push_str(&format!(
            "#define {name} ubo._custom[{slot}]{swizzle}\n",
            name = uniform.name
        ));
    }

    let mut sanitized = String::new();
    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version") || trimmed.starts_with("uniform ") {
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }

    Ok(format!("{PRELUDE}\n{defines}\n{sanitized}{FOOTER}"))
}

fn validate_name(name: &str) -> Result<(), WrapError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(WrapError::InvalidUniformName(name.to_string()));
    }
    if RESERVED.contains(&name) || name.starts_with("u_") || name.starts_with('_') {
        return Err(WrapError::ReservedUniformName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r"
        #version 300 es
        uniform float amount;
        vec4 transition(vec2 uv) {
            return mix(getFromColor(uv), getToColor(uv), progress * amount);
        }
    ";

    #[test]
    fn wrap_strips_version_and_uniform_lines() {
        let wrapped =
            wrap_custom_fragment(BODY, &[CustomUniform::new("amount", UniformKind::Float)])
                .unwrap();
        assert!(!wrapped.contains("uniform float amount"));
        assert!(!wrapped.contains("#version 300 es"));
        assert!(wrapped.contains("#define amount ubo._custom[0].x"));
        assert!(wrapped.contains("outColor = transition(v_uv);"));
    }

    #[test]
    fn slots_follow_declaration_order() {
        let uniforms = [
            CustomUniform::new("tint", UniformKind::Vec3),
            CustomUniform::new("center", UniformKind::Vec2),
            CustomUniform::new("bounds", UniformKind::Vec4),
        ];
        let wrapped = wrap_custom_fragment(BODY, &uniforms).unwrap();
        assert!(wrapped.contains("#define tint ubo._custom[0].xyz"));
        assert!(wrapped.contains("#define center ubo._custom[1].xy"));
        assert!(wrapped.contains("#define bounds ubo._custom[2]\n"));
    }

    #[test]
    fn missing_entry_point_is_rejected() {
        let err = wrap_custom_fragment("void main() {}", &[]).unwrap_err();
        assert_eq!(err, WrapError::MissingEntryPoint);
    }

    #[test]
    fn uniform_limits_and_names_are_enforced() {
        let many: Vec<_> = (0..=MAX_CUSTOM_UNIFORMS)
            .map(|index| CustomUniform::new(format!("p{index}"), UniformKind::Float))
            .collect();
        assert_eq!(
            wrap_custom_fragment(BODY, &many).unwrap_err(),
            WrapError::TooManyUniforms(MAX_CUSTOM_UNIFORMS + 1)
        );

        let err = wrap_custom_fragment(BODY, &[CustomUniform::new("1abc", UniformKind::Float)])
            .unwrap_err();
        assert!(matches!(err, WrapError::InvalidUniformName(_)));

        for reserved in ["progress", "u_progress", "_seed"] {
            let err =
                wrap_custom_fragment(BODY, &[CustomUniform::new(reserved, UniformKind::Float)])
                    .unwrap_err();
            assert!(matches!(err, WrapError::ReservedUniformName(_)), "{reserved}");
        }
    }
}
