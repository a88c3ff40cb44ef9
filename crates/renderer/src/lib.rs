//! Graphics resource manager for the transition engine.
//!
//! The renderer owns the wgpu device and every GPU object the engine uses,
//! keyed by string ids. It knows nothing about transitions: callers compile
//! programs, upload surfaces, set uniforms and draw the shared quad.
//!
//! ```text
//!   Renderer::initialize(target, options)
//!        │  primary backends ─▶ GL ─▶ software adapter ─▶ disabled
//!        ▼
//!   compile_shader_program(key, ProgramSource) ──▶ programs[key]
//!   create_or_update_texture(id, FrameSource)  ──▶ textures[id]
//!   create_framebuffer(id, w, h)               ──▶ framebuffers[id]
//!        │
//!        ▼
//!   use_program ─▶ set_uniform* ─▶ bind_texture ─▶ draw_fullscreen_quad ─▶ present
//! ```
//!
//! When no adapter can be acquired the renderer stays usable in a permanent
//! disabled mode: creation calls return `None`/`false`, draws do nothing and
//! nothing panics. Failures are logged through `tracing`, never returned as
//! errors.

mod compile;
mod context;
mod program;
mod readback;
mod textures;
mod types;
mod uniforms;

use std::collections::HashMap;

use image::RgbaImage;
use shaderlib::UniformValue;

use crate::context::{source_format, GpuContext};
use crate::program::{build_program, Program, SharedResources};
use crate::textures::GpuTexture;
use crate::uniforms::TransitionUniforms;

pub use crate::types::{
    AdapterProfile, ColorSpaceMode, FrameSource, GpuMemoryMode, GpuPowerPreference,
    ProgramHandle, ProgramSource, RenderTarget, RendererOptions, SurfaceHandle, TextureSlot,
    ESTIMATED_BYTES_PER_TEXTURE,
};

pub struct Renderer {
    gpu: Option<GpuState>,
    options: RendererOptions,
    size: (u32, u32),
}

struct GpuState {
    context: GpuContext,
    shared: SharedResources,
    placeholder: GpuTexture,
    output: Option<GpuTexture>,
    frame: Option<wgpu::SurfaceTexture>,
    programs: HashMap<String, Program>,
    textures: HashMap<String, GpuTexture>,
    framebuffers: HashMap<String, GpuTexture>,
    active_program: Option<String>,
    bound: HashMap<TextureSlot, String>,
    bound_framebuffer: Option<String>,
    uniforms: TransitionUniforms,
}

impl Renderer {
    /// Acquires the best available GPU context for `target`. Never fails: if
    /// every adapter tier is unavailable the renderer starts disabled.
    pub fn initialize(target: RenderTarget, options: RendererOptions) -> Self {
        let (width, height) = target.size();
        let size = (width.max(1), height.max(1));
        let gpu = match GpuContext::acquire(&target, &options) {
            Ok(context) => Some(GpuState::new(context)),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "GPU acceleration unavailable; rendering disabled"
                );
                None
            }
        };
        Self { gpu, options, size }
    }

    /// A renderer that never touches a GPU. Timing-only runs use this.
    pub fn disabled(width: u32, height: u32) -> Self {
        Self {
            gpu: None,
            options: RendererOptions::default(),
            size: (width.max(1), height.max(1)),
        }
    }

    pub fn is_gpu_enabled(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn adapter_profile(&self) -> Option<&AdapterProfile> {
        self.gpu.as_ref().map(|gpu| &gpu.context.adapter_profile)
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Size of the default framebuffer.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Compiles and links a program, caching it under `key`. A cached program
    /// is returned as is and never recompiled until evicted. Returns `None`
    /// when either stage fails or the renderer is disabled.
    pub fn compile_shader_program(
        &mut self,
        key: &str,
        source: &ProgramSource<'_>,
    ) -> Option<ProgramHandle> {
        let gpu = self.gpu.as_mut()?;
        if gpu.programs.contains_key(key) {
            return Some(ProgramHandle(key.to_string()));
        }
        let program = build_program(
            &gpu.context.device,
            &gpu.shared,
            key,
            source,
            gpu.context.color_format,
        )?;
        tracing::debug!(program = key, "compiled shader program");
        gpu.programs.insert(key.to_string(), program);
        Some(ProgramHandle(key.to_string()))
    }

    pub fn has_program(&self, key: &str) -> bool {
        self.gpu
            .as_ref()
            .is_some_and(|gpu| gpu.programs.contains_key(key))
    }

    /// Drops a cached program so the next compile under `key` rebuilds it.
    pub fn evict_program(&mut self, key: &str) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        if gpu.active_program.as_deref() == Some(key) {
            gpu.active_program = None;
        }
        gpu.programs.remove(key).is_some()
    }

    /// Selects the program for subsequent draws and resets the uniform block
    /// to its declared defaults.
    pub fn use_program(&mut self, handle: &ProgramHandle) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        let Some(program) = gpu.programs.get(handle.key()) else {
            tracing::debug!(program = handle.key(), "program is not compiled");
            return false;
        };
        gpu.uniforms.reset(&program.uniforms);
        gpu.active_program = Some(handle.key().to_string());
        true
    }

    /// Sets a uniform on the active program. Returns `false` for unknown
    /// names, mismatched shapes, or when nothing is selected.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        let Some(program) = gpu
            .active_program
            .as_deref()
            .and_then(|key| gpu.programs.get(key))
        else {
            return false;
        };
        if gpu.uniforms.set_builtin(name, value) {
            return true;
        }
        gpu.uniforms.set_custom(&program.custom, name, value)
    }

    /// Uploads `source` under `id`. The texture is created on first use and
    /// updated in place afterwards; it is only reallocated when the source
    /// size changes.
    pub fn create_or_update_texture(&mut self, id: &str, source: &FrameSource<'_>) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        if !source.is_well_formed() {
            tracing::warn!(
                texture = id,
                width = source.width,
                height = source.height,
                bytes = source.pixels.len(),
                "ignoring malformed frame source"
            );
            return false;
        }
        let max = gpu.context.adapter_profile.max_texture_dimension;
        if source.width > max || source.height > max {
            tracing::warn!(
                texture = id,
                width = source.width,
                height = source.height,
                max,
                "frame source exceeds the GPU texture limit"
            );
            return false;
        }

        let needs_allocation = gpu
            .textures
            .get(id)
            .map_or(true, |texture| !texture.size_matches(source.width, source.height));
        if needs_allocation {
            let format = source_format(gpu.context.color_format.is_srgb());
            let texture = textures::create_source_texture(
                &gpu.context.device,
                id,
                source.width,
                source.height,
                format,
            );
            tracing::debug!(texture = id, width = source.width, height = source.height, "allocated texture");
            gpu.textures.insert(id.to_string(), texture);
        }
        match gpu.textures.get(id) {
            Some(texture) => {
                textures::upload(&gpu.context.queue, texture, source);
                true
            }
            None => false,
        }
    }

    pub fn has_texture(&self, id: &str) -> bool {
        self.gpu
            .as_ref()
            .is_some_and(|gpu| gpu.textures.contains_key(id) || gpu.framebuffers.contains_key(id))
    }

    /// Binds a texture or framebuffer to a sampled slot. Unknown ids leave the
    /// slot bound to a transparent placeholder.
    pub fn bind_texture(&mut self, slot: TextureSlot, id: &str) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        gpu.bound.insert(slot, id.to_string());
        gpu.textures.contains_key(id) || gpu.framebuffers.contains_key(id)
    }

    /// Allocates an off-screen colour target. An existing framebuffer of the
    /// same size is kept.
    pub fn create_framebuffer(&mut self, id: &str, width: u32, height: u32) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        let (width, height) = (width.max(1), height.max(1));
        if gpu
            .framebuffers
            .get(id)
            .is_some_and(|framebuffer| framebuffer.size_matches(width, height))
        {
            return true;
        }
        let framebuffer = textures::create_render_texture(
            &gpu.context.device,
            id,
            width,
            height,
            gpu.context.color_format,
        );
        tracing::debug!(framebuffer = id, width, height, "allocated framebuffer");
        gpu.framebuffers.insert(id.to_string(), framebuffer);
        true
    }

    /// Directs draws to a framebuffer, or to the default target with `None`.
    /// Also points `u_resolution` at the new target's size.
    pub fn bind_framebuffer(&mut self, id: Option<&str>) -> bool {
        let default_size = self.size;
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        let size = match id {
            None => default_size,
            Some(id) => match gpu.framebuffers.get(id) {
                Some(framebuffer) => (framebuffer.width, framebuffer.height),
                None => {
                    tracing::warn!(framebuffer = id, "cannot bind unknown framebuffer");
                    return false;
                }
            },
        };
        gpu.bound_framebuffer = id.map(str::to_string);
        gpu.uniforms.set_resolution(size.0, size.1);
        true
    }

    /// Issues the single indexed triangle-strip draw covering the bound
    /// target with the active program.
    pub fn draw_fullscreen_quad(&mut self) -> bool {
        match self.gpu.as_mut() {
            Some(gpu) => gpu.draw(),
            None => false,
        }
    }

    /// Presents the current window frame. Headless targets have nothing to
    /// present and return `true`.
    pub fn present(&mut self) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        if let Some(frame) = gpu.frame.take() {
            frame.present();
        }
        true
    }

    /// Reads the default target of a headless renderer back to the CPU.
    pub fn read_output(&self) -> Option<RgbaImage> {
        let gpu = self.gpu.as_ref()?;
        let output = gpu.output.as_ref()?;
        match readback::read_texture(&gpu.context.device, &gpu.context.queue, output) {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read back output");
                None
            }
        }
    }

    /// Resizes the default target. Framebuffers keep their size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(width, height);
        }
    }

    /// Coarse memory estimate: a fixed per-texture cost
    /// ([`ESTIMATED_BYTES_PER_TEXTURE`]) times the number of textures and
    /// framebuffers. Not a measurement.
    pub fn estimate_gpu_memory_usage(&self) -> u64 {
        self.gpu.as_ref().map_or(0, |gpu| {
            (gpu.textures.len() + gpu.framebuffers.len()) as u64 * ESTIMATED_BYTES_PER_TEXTURE
        })
    }

    /// Tracked programs, textures and framebuffers.
    pub fn resource_count(&self) -> usize {
        self.gpu.as_ref().map_or(0, |gpu| {
            gpu.programs.len() + gpu.textures.len() + gpu.framebuffers.len()
        })
    }

    /// Releases every tracked resource and the device. Safe to call again;
    /// the renderer behaves as disabled afterwards.
    pub fn destroy(&mut self) {
        if let Some(mut gpu) = self.gpu.take() {
            let released = gpu.programs.len() + gpu.textures.len() + gpu.framebuffers.len();
            gpu.programs.clear();
            gpu.textures.clear();
            gpu.framebuffers.clear();
            gpu.frame = None;
            tracing::debug!(released, "destroyed renderer resources");
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl GpuState {
    fn new(context: GpuContext) -> Self {
        let shared = SharedResources::new(&context.device);
        let placeholder = textures::create_placeholder(
            &context.device,
            &context.queue,
            source_format(context.color_format.is_srgb()),
        );
        let output = context.window.is_none().then(|| {
            textures::create_render_texture(
                &context.device,
                "headless output",
                context.size.0,
                context.size.1,
                context.color_format,
            )
        });
        let uniforms = TransitionUniforms::new(context.size.0, context.size.1);
        Self {
            context,
            shared,
            placeholder,
            output,
            frame: None,
            programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            active_program: None,
            bound: HashMap::new(),
            bound_framebuffer: None,
            uniforms,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.context.size = (width, height);
        self.frame = None;
        if let Some(window) = self.context.window.as_mut() {
            window.config.width = width;
            window.config.height = height;
            window.surface.configure(&self.context.device, &window.config);
        } else {
            self.output = Some(textures::create_render_texture(
                &self.context.device,
                "headless output",
                width,
                height,
                self.context.color_format,
            ));
        }
        if self.bound_framebuffer.is_none() {
            self.uniforms.set_resolution(width, height);
        }
    }

    /// Makes sure a window frame is held for this frame's default-target draws.
    fn acquire_frame(&mut self) -> bool {
        if self.frame.is_some() {
            return true;
        }
        let Some(window) = self.context.window.as_ref() else {
            return self.output.is_some();
        };
        match window.surface.get_current_texture() {
            Ok(frame) => {
                self.frame = Some(frame);
                true
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost; reconfiguring");
                window.surface.configure(&self.context.device, &window.config);
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to acquire surface texture");
                false
            }
        }
    }

    fn sampled_view(&self, slot: TextureSlot) -> &wgpu::TextureView {
        let Some(id) = self.bound.get(&slot) else {
            return &self.placeholder.view;
        };
        if self.bound_framebuffer.as_ref() == Some(id) {
            tracing::warn!(
                texture = %id,
                "texture is also the render target; sampling placeholder instead"
            );
            return &self.placeholder.view;
        }
        self.textures
            .get(id)
            .or_else(|| self.framebuffers.get(id))
            .map_or(&self.placeholder.view, |texture| &texture.view)
    }

    fn draw(&mut self) -> bool {
        if self.bound_framebuffer.is_none() && !self.acquire_frame() {
            return false;
        }
        let Some(program) = self
            .active_program
            .as_deref()
            .and_then(|key| self.programs.get(key))
        else {
            tracing::debug!("draw skipped: no program selected");
            return false;
        };

        let frame_view;
        let target_view = match self.bound_framebuffer.as_deref() {
            Some(id) => match self.framebuffers.get(id) {
                Some(framebuffer) => &framebuffer.view,
                None => return false,
            },
            None => match (&self.frame, &self.output) {
                (Some(frame), _) => {
                    frame_view = frame
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    &frame_view
                }
                (None, Some(output)) => &output.view,
                (None, None) => return false,
            },
        };

        let device = &self.context.device;
        let queue = &self.context.queue;
        queue.write_buffer(
            &self.shared.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );
        let bind_group = self.shared.bind_group(
            device,
            self.sampled_view(TextureSlot::From),
            self.sampled_view(TextureSlot::To),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("transition encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("transition pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, self.shared.quad_vertices.slice(..));
            pass.set_index_buffer(self.shared.quad_indices.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..program::QUAD_INDICES.len() as u32, 0, 0..1);
        }
        queue.submit(Some(encoder.finish()));
        true
    }
}
