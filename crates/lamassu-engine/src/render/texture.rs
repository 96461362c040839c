use crate::batch::BatchError;
use crate::gfx::{Texture, TextureFilter, TextureId};

/// Pixel format of every texture the backend creates. Layer copies require
/// source and array formats to match.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A sampled 2D texture with its own sampler.
///
/// Cloning shares the GPU objects.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    id: TextureId,
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl GpuTexture {
    /// Uploads tightly packed RGBA8 rows, top row first.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: TextureFilter,
    ) -> Result<Self, BatchError> {
        if width == 0 || height == 0 {
            return Err(BatchError::Resource(format!("{label}: empty texture {width}x{height}")));
        }
        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(BatchError::Resource(format!(
                "{label}: {width}x{height} exceeds the device limit of {max}"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(BatchError::Resource(format!(
                "{label}: expected {expected} bytes of RGBA8, got {}",
                pixels.len()
            )));
        }

        Ok(Self::upload(device, queue, label, width, height, pixels, filter))
    }

    /// 1x1 texture of a single color.
    pub(crate) fn solid(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, rgba: [u8; 4]) -> Self {
        Self::upload(device, queue, label, 1, 1, &rgba, TextureFilter::Nearest)
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: TextureFilter,
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
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
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
        // single-level textures: a mip filter degrades to its in-level part
        let sampler = create_sampler(device, label, filter, filter, false);

        log::trace!("{label}: {width}x{height} texture");

        Self {
            id: TextureId::next(),
            width,
            height,
            texture,
            view,
            sampler,
        }
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

impl Texture for GpuTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Sampler for a mag/min filter pair.
///
/// Without `mipmapped` sampling stays on level 0 whatever the filters say.
pub(crate) fn create_sampler(
    device: &wgpu::Device,
    label: &str,
    mag: TextureFilter,
    min: TextureFilter,
    mipmapped: bool,
) -> wgpu::Sampler {
    let desc = sampler_descriptor(label, mag, min, mipmapped);
    device.create_sampler(&desc)
}

fn filter_mode(filter: TextureFilter) -> wgpu::FilterMode {
    if filter.is_linear_within_level() {
        wgpu::FilterMode::Linear
    } else {
        wgpu::FilterMode::Nearest
    }
}

fn sampler_descriptor(
    label: &str,
    mag: TextureFilter,
    min: TextureFilter,
    mipmapped: bool,
) -> wgpu::SamplerDescriptor<'_> {
    let use_mips = mipmapped && min.is_mipmap();
    wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter_mode(mag),
        min_filter: filter_mode(min),
        mipmap_filter: if use_mips && min.is_linear_between_levels() {
            wgpu::MipmapFilterMode::Linear
        } else {
            wgpu::MipmapFilterMode::Nearest
        },
        lod_max_clamp: if use_mips { 32.0 } else { 0.0 },
        ..Default::default()
    }
}
