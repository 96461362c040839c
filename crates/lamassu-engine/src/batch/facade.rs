use glam::{Affine2, Mat4};

use crate::gfx::{BlendFactor, BlendFunc, SourceRect, Texture, TextureRegion, Uv};
use crate::paint::Color;

use super::core::BatchStats;
use super::error::Result;
use super::geometry::{self, Placement};

/// The `begin` / draw / `end` surface shared by every batch.
///
/// Implementors provide the lifecycle, state setters and [`Batch::write_quads`];
/// every draw overload is built on top of those. Drawing outside
/// `begin`/`end` fails with [`BatchError::NotDrawing`](super::BatchError).
pub trait Batch {
    type Texture: Texture;
    type Shader: Clone;

    /// Starts a batch: binds the shader, uploads the matrices and resets the
    /// per-frame counters.
    fn begin(&mut self) -> Result<()>;

    /// Draws whatever is queued and restores GPU state.
    fn end(&mut self) -> Result<()>;

    /// Submits queued geometry now. Safe to call at any time.
    fn flush(&mut self);

    fn is_drawing(&self) -> bool;

    /// Queues whole sprite quads: 4 vertices of `x, y, packed color, u, v`
    /// per quad. `op` names the public entry point in errors.
    fn write_quads(&mut self, op: &'static str, texture: &Self::Texture, quads: &[f32])
        -> Result<()>;

    // ── color ─────────────────────────────────────────────────────────────

    /// Tint applied to subsequently queued vertices.
    fn set_color(&mut self, color: Color) -> Result<()> {
        self.set_packed_color(color.to_float_bits())
    }

    fn set_packed_color(&mut self, packed: f32) -> Result<()>;
    fn packed_color(&self) -> f32;

    fn color(&self) -> Color {
        Color::from_float_bits(self.packed_color())
    }

    // ── blending ──────────────────────────────────────────────────────────

    fn set_blend_function(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.set_blend_function_separate(src, dst, src, dst);
    }

    fn set_blend_function_separate(
        &mut self,
        src_color: BlendFactor,
        dst_color: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );

    fn blend_function(&self) -> BlendFunc;

    fn enable_blending(&mut self);
    fn disable_blending(&mut self);
    fn is_blending_enabled(&self) -> bool;

    // ── matrices ──────────────────────────────────────────────────────────

    fn set_projection_matrix(&mut self, projection: Mat4);
    fn projection_matrix(&self) -> Mat4;

    fn set_transform_matrix(&mut self, transform: Mat4);
    fn transform_matrix(&self) -> Mat4;

    // ── shader ────────────────────────────────────────────────────────────

    /// Installs a caller-supplied program; `None` restores the default.
    fn set_shader(&mut self, shader: Option<Self::Shader>) -> Result<()>;
    fn shader(&self) -> &Self::Shader;

    // ── diagnostics ───────────────────────────────────────────────────────

    fn stats(&self) -> BatchStats;

    fn render_calls(&self) -> u32 {
        self.stats().render_calls
    }

    fn total_render_calls(&self) -> u64 {
        self.stats().total_render_calls
    }

    fn max_sprites_in_batch(&self) -> u32 {
        self.stats().max_sprites_in_batch
    }

    // ── draws ─────────────────────────────────────────────────────────────

    /// Texture at its natural size.
    fn draw(&mut self, texture: &Self::Texture, x: f32, y: f32) -> Result<()> {
        let q = geometry::rect(
            x,
            y,
            texture.width() as f32,
            texture.height() as f32,
            Uv::FULL,
            self.packed_color(),
        );
        self.write_quads("draw", texture, &q)
    }

    fn draw_sized(
        &mut self,
        texture: &Self::Texture,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        let q = geometry::rect(x, y, width, height, Uv::FULL, self.packed_color());
        self.write_quads("draw_sized", texture, &q)
    }

    /// Explicit texture coordinates.
    fn draw_uv(
        &mut self,
        texture: &Self::Texture,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        uv: Uv,
    ) -> Result<()> {
        let q = geometry::rect(x, y, width, height, uv, self.packed_color());
        self.write_quads("draw_uv", texture, &q)
    }

    /// A pixel rectangle of the texture, drawn at its pixel size.
    fn draw_src(
        &mut self,
        texture: &Self::Texture,
        x: f32,
        y: f32,
        src: SourceRect,
        flip_x: bool,
        flip_y: bool,
    ) -> Result<()> {
        let uv = Uv::from_source(texture.width(), texture.height(), src).flipped(flip_x, flip_y);
        let q = geometry::rect(
            x,
            y,
            src.width as f32,
            src.height as f32,
            uv,
            self.packed_color(),
        );
        self.write_quads("draw_src", texture, &q)
    }

    /// Full form: origin, scale, rotation and flips.
    fn draw_quad(
        &mut self,
        texture: &Self::Texture,
        placement: &Placement,
        uv: Uv,
        flip_x: bool,
        flip_y: bool,
    ) -> Result<()> {
        let q = geometry::quad(placement, uv, flip_x, flip_y, self.packed_color());
        self.write_quads("draw_quad", texture, &q)
    }

    /// Region at its pixel size.
    fn draw_region(&mut self, region: &TextureRegion<Self::Texture>, x: f32, y: f32) -> Result<()> {
        let q = geometry::rect(
            x,
            y,
            region.region_width() as f32,
            region.region_height() as f32,
            region.quad_uv(),
            self.packed_color(),
        );
        self.write_quads("draw_region", region.texture(), &q)
    }

    fn draw_region_sized(
        &mut self,
        region: &TextureRegion<Self::Texture>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        let q = geometry::rect(x, y, width, height, region.quad_uv(), self.packed_color());
        self.write_quads("draw_region_sized", region.texture(), &q)
    }

    fn draw_region_transformed(
        &mut self,
        region: &TextureRegion<Self::Texture>,
        placement: &Placement,
    ) -> Result<()> {
        let q = geometry::quad(placement, region.quad_uv(), false, false, self.packed_color());
        self.write_quads("draw_region_transformed", region.texture(), &q)
    }

    /// Region with its texture coordinates turned a quarter turn, for
    /// regions packed rotated in an atlas.
    fn draw_region_rotated90(
        &mut self,
        region: &TextureRegion<Self::Texture>,
        placement: &Placement,
        clockwise: bool,
    ) -> Result<()> {
        let q = geometry::rotated90(
            placement,
            region.u,
            region.v,
            region.u2,
            region.v2,
            clockwise,
            self.packed_color(),
        );
        self.write_quads("draw_region_rotated90", region.texture(), &q)
    }

    fn draw_region_affine(
        &mut self,
        region: &TextureRegion<Self::Texture>,
        width: f32,
        height: f32,
        transform: &Affine2,
    ) -> Result<()> {
        let q = geometry::affine(width, height, transform, region.quad_uv(), self.packed_color());
        self.write_quads("draw_region_affine", region.texture(), &q)
    }

    /// Raw sprite records; see [`Batch::write_quads`].
    fn draw_vertices(&mut self, texture: &Self::Texture, vertices: &[f32]) -> Result<()> {
        self.write_quads("draw_vertices", texture, vertices)
    }
}
