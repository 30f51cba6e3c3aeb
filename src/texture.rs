use anyhow::{Context, Result};
use image::GenericImageView;

/// Role a texture plays in the Phong material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

impl TextureKind {
    /// Colour maps are stored in sRGB; specular intensity maps stay linear.
    fn format(self) -> wgpu::TextureFormat {
        match self {
            TextureKind::Diffuse => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureKind::Specular => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// GPU texture with its view, sampler and material role.
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub kind: TextureKind,
}

impl Texture {
    /// Decodes an image file's bytes and uploads them.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        kind: TextureKind,
    ) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .with_context(|| format!("unable to decode image {label}"))?;
        Ok(Self::from_image(device, queue, &img, label, kind))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: &str,
        kind: TextureKind,
    ) -> Self {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();
        Self::upload(device, queue, &rgba, width, height, label, kind)
    }

    /// Creates a 1x1 texture of a single colour, used when a material does
    /// not reference an image on disk.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
        kind: TextureKind,
    ) -> Self {
        Self::upload(device, queue, &rgba, 1, 1, label, kind)
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        label: &str,
        kind: TextureKind,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: kind.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffuse_is_srgb_and_specular_is_linear() {
        assert_eq!(
            TextureKind::Diffuse.format(),
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
        assert_eq!(
            TextureKind::Specular.format(),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }
}
