//! Contracts between the batches and the GPU.
//!
//! A batch never talks to wgpu directly. It sees textures through
//! [`Texture`], regions through [`TextureRegion`]/[`PolygonRegion`] and the
//! device through the [`Graphics`] backend trait. [`RecordingGraphics`] is the
//! in-memory backend used by the tests.

mod blend;
mod graphics;
mod recording;
mod region;
mod shader;
mod texture;

pub use blend::{BlendFactor, BlendFunc};
pub use graphics::{ArrayTextureDesc, Graphics, MeshDesc, Primitive};
pub use recording::{
    DrawCall, Event, RecordedArrayTexture, RecordedMesh, RecordedShader, RecordedTexture,
    RecordingGraphics,
};
pub use region::{PolygonRegion, SourceRect, TextureRegion, Uv};
pub use shader::{ShaderKind, VertexFormat, U_PROJ_TRANS, U_TEXTURE, U_TEXTURES};
pub use texture::{Texture, TextureFilter, TextureId};
