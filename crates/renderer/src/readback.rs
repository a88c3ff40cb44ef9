use anyhow::{anyhow, Context, Result};
use image::RgbaImage;

use crate::textures::GpuTexture;

pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drops the row padding `copy_texture_to_buffer` requires.
pub(crate) fn strip_row_padding(data: &[u8], width: u32, height: u32, padded: u32) -> Vec<u8> {
    let row_bytes = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * padded as usize;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

/// Copies an RGBA8 texture back to the CPU. Blocks until the GPU is done.
pub(crate) fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &GpuTexture,
) -> Result<RgbaImage> {
    let padded = padded_bytes_per_row(source.width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("output readback"),
        size: u64::from(padded) * u64::from(source.height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("output readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &source.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(source.height),
            },
        },
        wgpu::Extent3d {
            width: source.width,
            height: source.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| anyhow!("device poll failed: {err}"))?;
    rx.recv()
        .context("readback channel closed")?
        .map_err(|err| anyhow!("failed to map readback buffer: {err}"))?;

    let pixels = {
        let mapped = slice.get_mapped_range();
        strip_row_padding(&mapped, source.width, source.height, padded)
    };
    buffer.unmap();

    RgbaImage::from_raw(source.width, source.height, pixels)
        .ok_or_else(|| anyhow!("readback produced a short buffer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        let padded = 8;
        let data = [1, 2, 3, 4, 9, 9, 9, 9, 5, 6, 7, 8, 9, 9, 9, 9];
        assert_eq!(
            strip_row_padding(&data, 1, 2, padded),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
    }
}
