use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::types::FrameSource;

/// A 2D colour texture and its default view.
pub(crate) struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    pub fn size_matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn descriptor<'a>(
    label: &'a str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureDescriptor<'a> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    }
}

fn wrap(texture: wgpu::Texture) -> GpuTexture {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        width: texture.width(),
        height: texture.height(),
        texture,
        view,
    }
}

/// Sampled texture for uploaded surfaces.
pub(crate) fn create_source_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> GpuTexture {
    let usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
    wrap(device.create_texture(&descriptor(label, width, height, format, usage)))
}

/// Render target that can later be sampled or copied out.
pub(crate) fn create_render_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> GpuTexture {
    let usage = wgpu::TextureUsages::RENDER_ATTACHMENT
        | wgpu::TextureUsages::TEXTURE_BINDING
        | wgpu::TextureUsages::COPY_SRC;
    wrap(device.create_texture(&descriptor(label, width, height, format, usage)))
}

/// 1x1 transparent texture bound to slots nobody filled.
pub(crate) fn create_placeholder(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: wgpu::TextureFormat,
) -> GpuTexture {
    let usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
    wrap(device.create_texture_with_data(
        queue,
        &descriptor("placeholder texture", 1, 1, format, usage),
        TextureDataOrder::LayerMajor,
        &[0u8, 0, 0, 0],
    ))
}

/// Re-uploads pixel data in place. The caller guarantees the sizes match.
pub(crate) fn upload(queue: &wgpu::Queue, target: &GpuTexture, source: &FrameSource<'_>) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        source.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(source.width * 4),
            rows_per_image: Some(source.height),
        },
        extent(source.width, source.height),
    );
}
