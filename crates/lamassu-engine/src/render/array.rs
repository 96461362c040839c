use crate::batch::BatchError;
use crate::gfx::{ArrayTextureDesc, TextureFilter};

use super::texture::{create_sampler, TEXTURE_FORMAT};

/// Layered 2D texture with a full mip chain per layer.
#[derive(Debug)]
pub struct GpuArrayTexture {
    id: u32,
    desc: ArrayTextureDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    mip_levels: u32,
}

impl GpuArrayTexture {
    pub(crate) fn new(
        device: &wgpu::Device,
        id: u32,
        desc: &ArrayTextureDesc,
    ) -> Result<Self, BatchError> {
        let limits = device.limits();
        if desc.layers == 0 || desc.layers > limits.max_texture_array_layers {
            return Err(BatchError::InvalidConfig(format!(
                "{} layers requested, device supports 1..={}",
                desc.layers, limits.max_texture_array_layers
            )));
        }
        let max = limits.max_texture_dimension_2d;
        if desc.layer_width == 0
            || desc.layer_height == 0
            || desc.layer_width > max
            || desc.layer_height > max
        {
            return Err(BatchError::InvalidConfig(format!(
                "layer size {}x{} outside 1..={max}",
                desc.layer_width, desc.layer_height
            )));
        }

        let mip_levels = mip_chain_len(desc.layer_width, desc.layer_height);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.layer_width,
                height: desc.layer_height,
                depth_or_array_layers: desc.layers,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(desc.label),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = create_sampler(device, desc.label, desc.mag_filter, desc.min_filter, true);

        log::debug!(
            "{}: {} layers of {}x{}, {mip_levels} mip levels",
            desc.label,
            desc.layers,
            desc.layer_width,
            desc.layer_height
        );

        Ok(Self {
            id,
            desc: *desc,
            texture,
            view,
            sampler,
            mip_levels,
        })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn desc(&self) -> &ArrayTextureDesc {
        &self.desc
    }

    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
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

    pub(crate) fn set_filter(&mut self, device: &wgpu::Device, mag: TextureFilter, min: TextureFilter) {
        self.desc.mag_filter = mag;
        self.desc.min_filter = min;
        self.sampler = create_sampler(device, self.desc.label, mag, min, true);
    }

    /// Single-level, single-layer view used as a blit source or target.
    pub(crate) fn layer_view(&self, level: u32, layer: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("lamassu layer view"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: level,
            mip_level_count: Some(1),
            base_array_layer: layer,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }

    pub(crate) fn destroy(self) {
        self.texture.destroy();
    }
}

/// Levels down to 1x1 for a `width` x `height` base.
pub(crate) fn mip_chain_len(width: u32, height: u32) -> u32 {
    u32::BITS - width.max(height).max(1).leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_reaches_one_pixel() {
        assert_eq!(mip_chain_len(1, 1), 1);
        assert_eq!(mip_chain_len(256, 256), 9);
        assert_eq!(mip_chain_len(300, 20), 9);
        assert_eq!(mip_chain_len(2048, 4096), 13);
    }
}
