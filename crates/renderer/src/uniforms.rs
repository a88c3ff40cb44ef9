use bytemuck::{Pod, Zeroable};
use shaderlib::{names, CustomUniform, UniformDecl, UniformValue, MAX_CUSTOM_UNIFORMS};

/// CPU mirror of the `TransitionParams` block declared by the shader prelude
/// (std140).
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TransitionUniforms {
    pub resolution: [f32; 2],
    pub progress: f32,
    pub intensity: f32,
    pub direction: [f32; 2],
    pub origin: [f32; 2],
    pub color: [f32; 4],
    pub rgb_offset: [f32; 2],
    pub block_count: f32,
    pub softness: f32,
    pub scale: f32,
    pub rotation: f32,
    pub mode: f32,
    pub seed: f32,
    pub custom: [[f32; 4]; MAX_CUSTOM_UNIFORMS],
}

unsafe impl Zeroable for TransitionUniforms {}
unsafe impl Pod for TransitionUniforms {}

impl TransitionUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.set_resolution(width, height);
        uniforms
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = [width.max(1) as f32, height.max(1) as f32];
    }

    /// Clears everything except the resolution, then applies the declared
    /// defaults of the newly selected program.
    pub fn reset(&mut self, defaults: &[UniformDecl]) {
        let resolution = self.resolution;
        *self = Self::zeroed();
        self.resolution = resolution;
        for decl in defaults {
            if decl.name != names::RESOLUTION {
                self.set_builtin(decl.name, decl.default);
            }
        }
    }

    /// Writes a prelude uniform. Returns `false` when the name is unknown or
    /// the value has the wrong shape.
    pub fn set_builtin(&mut self, name: &str, value: UniformValue) -> bool {
        match (name, value) {
            (names::RESOLUTION, UniformValue::Vec2(v)) => self.resolution = v,
            (names::PROGRESS, UniformValue::Float(v)) => self.progress = v,
            (names::INTENSITY, UniformValue::Float(v)) => self.intensity = v,
            (names::DIRECTION, UniformValue::Vec2(v)) => self.direction = v,
            (names::ORIGIN, UniformValue::Vec2(v)) => self.origin = v,
            (names::COLOR, UniformValue::Vec4(v)) => self.color = v,
            (names::COLOR, UniformValue::Vec3([r, g, b])) => self.color = [r, g, b, 1.0],
            (names::RGB_OFFSET, UniformValue::Vec2(v)) => self.rgb_offset = v,
            (names::BLOCK_COUNT, UniformValue::Float(v)) => self.block_count = v,
            (names::SOFTNESS, UniformValue::Float(v)) => self.softness = v,
            (names::SCALE, UniformValue::Float(v)) => self.scale = v,
            (names::ROTATION, UniformValue::Float(v)) => self.rotation = v,
            (names::MODE, UniformValue::Float(v)) => self.mode = v,
            (names::SEED, UniformValue::Float(v)) => self.seed = v,
            _ => return false,
        }
        true
    }

    /// Writes a caller uniform into the slot the program assigned it.
    pub fn set_custom(&mut self, layout: &[CustomUniform], name: &str, value: UniformValue) -> bool {
        let Some(slot) = layout.iter().position(|uniform| uniform.name == name) else {
            return false;
        };
        if layout[slot].kind != value.kind() {
            return false;
        }
        match self.custom.get_mut(slot) {
            Some(lanes) => {
                *lanes = value.to_vec4();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    fn offset_of<T>(base: &TransitionUniforms, field: &T) -> usize {
        (field as *const T as usize) - (base as *const TransitionUniforms as usize)
    }

    #[test]
    fn layout_matches_std140_block() {
        let uniforms = TransitionUniforms::new(640, 480);
        assert_eq!(size_of::<TransitionUniforms>(), 208);
        assert_eq!(align_of::<TransitionUniforms>(), 16);
        assert_eq!(offset_of(&uniforms, &uniforms.resolution), 0);
        assert_eq!(offset_of(&uniforms, &uniforms.progress), 8);
        assert_eq!(offset_of(&uniforms, &uniforms.intensity), 12);
        assert_eq!(offset_of(&uniforms, &uniforms.direction), 16);
        assert_eq!(offset_of(&uniforms, &uniforms.origin), 24);
        assert_eq!(offset_of(&uniforms, &uniforms.color), 32);
        assert_eq!(offset_of(&uniforms, &uniforms.rgb_offset), 48);
        assert_eq!(offset_of(&uniforms, &uniforms.block_count), 56);
        assert_eq!(offset_of(&uniforms, &uniforms.softness), 60);
        assert_eq!(offset_of(&uniforms, &uniforms.scale), 64);
        assert_eq!(offset_of(&uniforms, &uniforms.rotation), 68);
        assert_eq!(offset_of(&uniforms, &uniforms.mode), 72);
        assert_eq!(offset_of(&uniforms, &uniforms.seed), 76);
        assert_eq!(offset_of(&uniforms, &uniforms.custom), 80);
    }

    #[test]
    fn builtin_setters_check_shape() {
        let mut uniforms = TransitionUniforms::new(1, 1);
        assert!(uniforms.set_builtin(names::PROGRESS, UniformValue::Float(0.25)));
        assert_eq!(uniforms.progress, 0.25);
        assert!(!uniforms.set_builtin(names::PROGRESS, UniformValue::Vec2([1.0, 2.0])));
        assert!(!uniforms.set_builtin("u_unknown", UniformValue::Float(1.0)));
        assert!(uniforms.set_builtin(names::COLOR, UniformValue::Vec3([1.0, 0.5, 0.0])));
        assert_eq!(uniforms.color, [1.0, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn reset_keeps_resolution_and_applies_defaults() {
        let mut uniforms = TransitionUniforms::new(800, 600);
        uniforms.mode = 3.0;
        uniforms.progress = 0.9;
        let library = shaderlib::ShaderLibrary::builtin();
        let zoom = library.get(shaderlib::ShaderFamily::Zoom).unwrap();
        uniforms.reset(zoom.uniforms);
        assert_eq!(uniforms.resolution, [800.0, 600.0]);
        assert_eq!(uniforms.mode, 0.0);
        assert_eq!(uniforms.progress, 0.0);
        assert_eq!(uniforms.origin, [0.5, 0.5]);
        assert_eq!(uniforms.intensity, 1.0);
    }

    #[test]
    fn custom_slots_follow_layout() {
        let layout = [
            CustomUniform::new("amount", shaderlib::UniformKind::Float),
            CustomUniform::new("center", shaderlib::UniformKind::Vec2),
        ];
        let mut uniforms = TransitionUniforms::new(1, 1);
        assert!(uniforms.set_custom(&layout, "center", UniformValue::Vec2([0.3, 0.7])));
        assert_eq!(uniforms.custom[1], [0.3, 0.7, 0.0, 0.0]);
        assert!(!uniforms.set_custom(&layout, "center", UniformValue::Float(1.0)));
        assert!(!uniforms.set_custom(&layout, "missing", UniformValue::Float(1.0)));
    }
}
