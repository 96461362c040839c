//! wgpu backend for the batches.
//!
//! [`WgpuGraphics`] implements [`crate::gfx::Graphics`] on a device and queue
//! and draws into whatever [`RenderTarget`] it was last given.
//!
//! Convention:
//! - Geometry is in world units with the origin at the bottom-left corner.
//! - The vertex shader applies the batch's combined projection matrix.

mod array;
mod graphics;
mod limits;
mod mipmap;
mod pipeline;
mod shader;
mod target;
mod texture;

pub use array::GpuArrayTexture;
pub use graphics::{GpuMesh, WgpuGraphics};
pub use limits::{max_texture_units, MAX_SHADER_UNITS};
pub use shader::{default_source, GpuShader};
pub use target::{RenderCtx, RenderTarget};
pub use texture::{GpuTexture, TEXTURE_FORMAT};
