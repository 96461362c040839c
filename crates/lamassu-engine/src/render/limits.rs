//! Hardware limits queried once per process.

use std::sync::OnceLock;

/// Upper bound on texture units a generated multi-texture shader declares.
pub const MAX_SHADER_UNITS: u32 = 32;

static MAX_TEXTURE_UNITS: OnceLock<u32> = OnceLock::new();

/// Texture units usable by one fragment shader, capped at
/// [`MAX_SHADER_UNITS`].
///
/// Every unit binds its own texture and sampler, so the smaller of the two
/// per-stage limits applies.
///
/// The first device asked decides the answer for the rest of the process.
pub fn max_texture_units(device: &wgpu::Device) -> u32 {
    *MAX_TEXTURE_UNITS.get_or_init(|| {
        let limits = device.limits();
        let (textures, samplers) = (
            limits.max_sampled_textures_per_shader_stage,
            limits.max_samplers_per_shader_stage,
        );
        let units = clamp_units(textures, samplers);
        log::debug!("texture units: {units} (device reports {textures} textures, {samplers} samplers)");
        units
    })
}

#[inline]
fn clamp_units(textures: u32, samplers: u32) -> u32 {
    textures.min(samplers).min(MAX_SHADER_UNITS)
}
