use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use shaderlib::{CustomUniform, ShaderDefinition, UniformDecl};

/// Byte cost charged per texture or framebuffer by
/// [`Renderer::estimate_gpu_memory_usage`](crate::Renderer::estimate_gpu_memory_usage):
/// one 1080p RGBA8 surface.
pub const ESTIMATED_BYTES_PER_TEXTURE: u64 = 1920 * 1080 * 4;

/// Anything a presentable surface can be created from (a winit window, an
/// SDL window, ...).
pub trait SurfaceHandle: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T> SurfaceHandle for T where T: HasWindowHandle + HasDisplayHandle + Send + Sync {}

/// Where the renderer's default framebuffer lives.
#[derive(Clone)]
pub enum RenderTarget {
    /// Off-screen RGBA8 texture that can be read back with
    /// [`Renderer::read_output`](crate::Renderer::read_output).
    Headless { width: u32, height: u32 },
    /// A window surface owned by the caller.
    Window {
        handle: Arc<dyn SurfaceHandle>,
        width: u32,
        height: u32,
    },
}

impl RenderTarget {
    pub fn headless(width: u32, height: u32) -> Self {
        RenderTarget::Headless { width, height }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            RenderTarget::Headless { width, height } => (*width, *height),
            RenderTarget::Window { width, height, .. } => (*width, *height),
        }
    }
}

impl fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderTarget::Headless { width, height } => f
                .debug_struct("Headless")
                .field("width", width)
                .field("height", height)
                .finish(),
            RenderTarget::Window { width, height, .. } => f
                .debug_struct("Window")
                .field("width", width)
                .field("height", height)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuMemoryMode {
    Balanced,
    #[default]
    Performance,
}

/// Output colour handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded surfaces, sampled and written without conversion.
    #[default]
    Gamma,
    /// sRGB surfaces; shader output is treated as linear.
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererOptions {
    pub power: GpuPowerPreference,
    pub memory: GpuMemoryMode,
    pub color_space: ColorSpaceMode,
    /// Accept a software rasterizer as the last fallback tier.
    pub allow_software: bool,
    /// Present with vsync on window targets.
    pub vsync: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            power: GpuPowerPreference::High,
            memory: GpuMemoryMode::Performance,
            color_space: ColorSpaceMode::Gamma,
            allow_software: true,
            vsync: true,
        }
    }
}

/// Summary of the adapter the renderer settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub driver: String,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            driver: info.driver.clone(),
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

impl fmt::Display for AdapterProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// Tightly packed RGBA8 pixels, top row first.
#[derive(Debug, Clone, Copy)]
pub struct FrameSource<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

impl<'a> FrameSource<'a> {
    pub fn new(width: u32, height: u32, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() as u64 == u64::from(self.width) * u64::from(self.height) * 4
    }
}

impl<'a> From<&'a RgbaImage> for FrameSource<'a> {
    fn from(image: &'a RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.as_raw(),
        }
    }
}

/// Which sampled surface a texture is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    From,
    To,
}

/// Everything needed to build one program: both stages plus the uniform
/// schema applied whenever the program is selected.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub uniforms: &'a [UniformDecl],
    pub custom: &'a [CustomUniform],
}

impl<'a> ProgramSource<'a> {
    pub fn from_definition(definition: &'a ShaderDefinition, fragment: &'a str) -> Self {
        Self {
            vertex: definition.vertex,
            fragment,
            uniforms: definition.uniforms,
            custom: &[],
        }
    }
}

/// Cache key of a compiled program. Stays valid until the program is evicted
/// or the renderer destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) String);

impl ProgramHandle {
    pub fn key(&self) -> &str {
        &self.0
    }
}
