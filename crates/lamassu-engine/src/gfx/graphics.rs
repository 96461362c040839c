use glam::Mat4;

use crate::batch::BatchError;
use crate::coords::Viewport;

use super::blend::BlendFunc;
use super::shader::{ShaderKind, VertexFormat};
use super::texture::{Texture, TextureFilter};

/// Primitive assembly for [`Graphics::render`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    Lines,
}

/// Mesh allocation request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeshDesc {
    pub label: &'static str,
    pub format: VertexFormat,
    pub max_vertices: u32,
    pub max_indices: u32,
}

/// Array texture allocation request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArrayTextureDesc {
    pub label: &'static str,
    pub layer_width: u32,
    pub layer_height: u32,
    pub layers: u32,
    pub mag_filter: TextureFilter,
    pub min_filter: TextureFilter,
}

/// GPU backend consumed by the batches.
///
/// The batches own one backend instance each and drive it synchronously:
/// every call completes before the next one is issued. State set here
/// (bound units, blend, depth mask) applies to subsequent `render` calls.
pub trait Graphics {
    type Texture: Texture;
    type ArrayTexture;
    type Shader: Clone;
    type Mesh;

    /// Size of the current render target in world units.
    fn viewport(&self) -> Viewport;

    /// Number of 2D textures one shader may sample simultaneously.
    fn max_texture_units(&self) -> u32;

    // ── mesh ──────────────────────────────────────────────────────────────

    fn create_mesh(&mut self, desc: &MeshDesc) -> Result<Self::Mesh, BatchError>;

    /// Replaces the mesh's vertex data starting at vertex 0.
    fn upload_vertices(&mut self, mesh: &mut Self::Mesh, vertices: &[f32]);

    /// Replaces the mesh's index data starting at index 0.
    fn upload_indices(&mut self, mesh: &mut Self::Mesh, indices: &[u16]);

    /// Draws `count` indices starting at `offset`.
    fn render(
        &mut self,
        mesh: &Self::Mesh,
        shader: &Self::Shader,
        primitive: Primitive,
        offset: u32,
        count: u32,
    );

    fn dispose_mesh(&mut self, mesh: Self::Mesh);

    // ── shader ────────────────────────────────────────────────────────────

    fn create_default_shader(&mut self, kind: ShaderKind) -> Result<Self::Shader, BatchError>;

    fn begin_shader(&mut self, shader: &Self::Shader);
    fn end_shader(&mut self, shader: &Self::Shader);

    fn set_uniform_matrix(&mut self, shader: &Self::Shader, name: &str, value: &Mat4);
    fn set_uniform_int(&mut self, shader: &Self::Shader, name: &str, value: i32);
    fn set_uniform_ints(&mut self, shader: &Self::Shader, name: &str, values: &[i32]);

    fn dispose_shader(&mut self, shader: Self::Shader);

    // ── textures ──────────────────────────────────────────────────────────

    fn bind_texture(&mut self, unit: u32, texture: &Self::Texture);

    fn create_array_texture(
        &mut self,
        desc: &ArrayTextureDesc,
    ) -> Result<Self::ArrayTexture, BatchError>;

    /// Copies `texture`'s pixels into the top-left corner of `layer`, mip 0.
    fn copy_to_layer(&mut self, array: &Self::ArrayTexture, layer: u32, texture: &Self::Texture);

    /// Rebuilds the mip chain of the given layers from their level 0.
    fn generate_mipmaps(&mut self, array: &Self::ArrayTexture, layers: &[u32]);

    fn set_array_filter(
        &mut self,
        array: &mut Self::ArrayTexture,
        mag: TextureFilter,
        min: TextureFilter,
    );

    fn bind_array_texture(&mut self, unit: u32, array: &Self::ArrayTexture);

    fn dispose_array_texture(&mut self, array: Self::ArrayTexture);

    // ── fixed-function state ──────────────────────────────────────────────

    fn set_depth_mask(&mut self, enabled: bool);

    /// `None` disables blending.
    fn set_blend(&mut self, blend: Option<BlendFunc>);
}
