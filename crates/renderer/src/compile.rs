use std::borrow::Cow;

use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::{FastHashMap, ShaderStage};

/// Parses and validates GLSL with naga, without touching a device.
///
/// Running this first keeps malformed sources away from the driver and gives
/// a readable diagnostic instead of an uncaptured device error.
pub(crate) fn validate_glsl(source: &str, stage: ShaderStage) -> Result<(), String> {
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(
            &glsl::Options {
                stage,
                defines: FastHashMap::default(),
            },
            source,
        )
        .map_err(|err| format!("parse error: {err:?}"))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| format!("validation error: {err:?}"))?;
    Ok(())
}

fn stage_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        ShaderStage::Compute => "compute",
        _ => "other",
    }
}

/// Compiles one stage. Failures are logged with the program key and stage and
/// reported as `None`.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    key: &str,
    source: &str,
    stage: ShaderStage,
) -> Option<wgpu::ShaderModule> {
    if let Err(message) = validate_glsl(source, stage) {
        tracing::warn!(
            program = key,
            stage = stage_name(stage),
            %message,
            "shader failed to compile"
        );
        return None;
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(key),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_owned()),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        tracing::warn!(
            program = key,
            stage = stage_name(stage),
            error = %err,
            "device rejected shader module"
        );
        return None;
    }
    Some(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaderlib::{wrap_custom_fragment, CustomUniform, ShaderFamily, ShaderLibrary, UniformKind};

    #[test]
    fn builtin_programs_validate() {
        let library = ShaderLibrary::builtin();
        validate_glsl(library.vertex_source(), ShaderStage::Vertex).expect("vertex stage");
        for family in ShaderFamily::ALL {
            let definition = library.get(family).unwrap();
            if let Err(message) = validate_glsl(&definition.fragment_source(), ShaderStage::Fragment)
            {
                panic!("{family} failed: {message}");
            }
        }
    }

    #[test]
    fn wrapped_custom_programs_validate() {
        let source = r"
            vec4 transition(vec2 uv) {
                vec2 offset = (uv - center) * amount;
                return mix(getFromColor(uv + offset), getToColor(uv), progress) * tint;
            }
        ";
        let wrapped = wrap_custom_fragment(
            source,
            &[
                CustomUniform::new("amount", UniformKind::Float),
                CustomUniform::new("center", UniformKind::Vec2),
                CustomUniform::new("tint", UniformKind::Vec4),
            ],
        )
        .unwrap();
        validate_glsl(&wrapped, ShaderStage::Fragment).expect("custom program");
    }

    #[test]
    fn broken_source_reports_an_error() {
        let wrapped = wrap_custom_fragment(
            "vec4 transition(vec2 uv) { return undefined_helper(uv); }",
            &[],
        )
        .unwrap();
        assert!(validate_glsl(&wrapped, ShaderStage::Fragment).is_err());
    }
}
