use crate::gfx::{Graphics, ShaderKind, Texture, U_TEXTURE};

use super::config::{check_quads, SpriteBatchConfig};
use super::core::{forward_batch_state, BatchCore, Bindings, Indices};
use super::error::{BatchError, Result};
use super::facade::Batch;
use super::geometry::SPRITE_QUAD;
use super::vertices::QUAD_VERTICES;

/// The texture of the geometry currently queued, bound at unit 0.
pub(crate) struct SingleTexture<T> {
    texture: Option<T>,
}

impl<T: Texture> SingleTexture<T> {
    pub(crate) fn new() -> Self {
        Self { texture: None }
    }

    #[inline]
    pub(crate) fn is_current(&self, texture: &T) -> bool {
        self.texture.as_ref().is_some_and(|t| t.id() == texture.id())
    }

    #[inline]
    pub(crate) fn set(&mut self, texture: &T) {
        self.texture = Some(texture.clone());
    }
}

impl<G: Graphics> Bindings<G> for SingleTexture<G::Texture> {
    fn bind(&mut self, graphics: &mut G) {
        if let Some(texture) = &self.texture {
            graphics.bind_texture(0, texture);
        }
    }

    fn setup_uniforms(&self, graphics: &mut G, shader: &G::Shader) {
        graphics.set_uniform_int(shader, U_TEXTURE, 0);
    }
}

/// Single-texture quad batch.
///
/// Geometry accumulates until the buffer is full, the texture changes, a
/// state setter needs a flush, or `end` is called.
pub struct SpriteBatch<G: Graphics> {
    core: BatchCore<G>,
    slots: SingleTexture<G::Texture>,
}

impl<G: Graphics> SpriteBatch<G> {
    pub fn new(graphics: G, config: SpriteBatchConfig) -> Result<Self> {
        check_quads(config.max_sprites)?;
        let core = BatchCore::new(
            graphics,
            "lamassu sprite batch",
            ShaderKind::Sprite,
            config.max_sprites * QUAD_VERTICES,
            Indices::Quads,
        )?;
        Ok(Self {
            core,
            slots: SingleTexture::new(),
        })
    }

    #[inline]
    pub fn graphics(&self) -> &G {
        &self.core.graphics
    }

    #[inline]
    pub fn graphics_mut(&mut self) -> &mut G {
        &mut self.core.graphics
    }

    /// Releases the mesh and the default shader and returns the backend.
    pub fn dispose(self) -> G {
        self.core.dispose()
    }

    fn switch_texture(&mut self, texture: &G::Texture) {
        if self.slots.is_current(texture) {
            return;
        }
        self.core.flush(&mut self.slots);
        self.slots.set(texture);
    }
}

impl<G: Graphics> Batch for SpriteBatch<G> {
    type Texture = G::Texture;
    type Shader = G::Shader;

    fn begin(&mut self) -> Result<()> {
        self.core.begin(&self.slots)
    }

    fn end(&mut self) -> Result<()> {
        self.core.end(&mut self.slots)
    }

    fn write_quads(&mut self, op: &'static str, texture: &G::Texture, quads: &[f32]) -> Result<()> {
        self.core.check_draw(op)?;
        if quads.len() % SPRITE_QUAD != 0 {
            return Err(BatchError::InvalidVertexData {
                len: quads.len(),
                record: SPRITE_QUAD,
            });
        }

        self.switch_texture(texture);

        let mut rest = quads;
        while !rest.is_empty() {
            if !self.core.vertices.fits(SPRITE_QUAD) {
                self.core.flush(&mut self.slots);
            }
            let room = self.core.vertices.remaining() / SPRITE_QUAD * SPRITE_QUAD;
            let (head, tail) = rest.split_at(room.min(rest.len()));
            self.core.vertices.push(head);
            rest = tail;
        }
        Ok(())
    }

    forward_batch_state!();
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::batch::geometry;
    use crate::gfx::{
        BlendFactor, BlendFunc, Event, RecordedTexture, RecordingGraphics, TextureRegion, Uv,
    };
    use crate::paint::Color;

    fn batch(max_sprites: usize) -> SpriteBatch<RecordingGraphics> {
        SpriteBatch::new(RecordingGraphics::new(), SpriteBatchConfig { max_sprites })
            .expect("batch")
    }

    fn renders(b: &SpriteBatch<RecordingGraphics>) -> usize {
        b.graphics().draws().len()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn rejects_oversized_batches() {
        let err = SpriteBatch::new(RecordingGraphics::new(), SpriteBatchConfig { max_sprites: 8192 })
            .err();
        assert_eq!(
            err,
            Some(BatchError::BatchTooLarge {
                requested: 8192,
                max: 8191
            })
        );
    }

    #[test]
    fn shader_failure_is_reported_at_construction() {
        let g = RecordingGraphics::new().with_shader_failure("syntax error");
        let err = SpriteBatch::new(g, SpriteBatchConfig::default()).err();
        assert!(matches!(err, Some(BatchError::ShaderCompile { ref log, .. }) if log == "syntax error"));
    }

    #[test]
    fn draw_outside_begin_is_an_error() {
        let mut b = batch(10);
        let t = RecordedTexture::new(4, 4);
        assert_eq!(b.draw(&t, 0.0, 0.0), Err(BatchError::NotDrawing { op: "draw" }));
        assert!(b.set_color(Color::BLACK).is_err());
        assert_eq!(b.end(), Err(BatchError::NotDrawing { op: "end" }));
        b.flush();
        assert_eq!(renders(&b), 0);
    }

    #[test]
    fn nested_begin_is_an_error() {
        let mut b = batch(10);
        b.begin().unwrap();
        assert_eq!(b.begin(), Err(BatchError::AlreadyDrawing));
        assert!(b.is_drawing());
    }

    #[test]
    fn begin_and_end_toggle_depth_writes_and_blending() {
        let mut b = batch(10);
        let t = RecordedTexture::new(4, 4);
        b.begin().unwrap();
        assert!(!b.graphics().depth_mask());
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        assert!(b.graphics().depth_mask());
        assert_eq!(b.graphics().blend(), None);
        assert_eq!(b.graphics().draws()[0].blend, Some(BlendFunc::ALPHA));
        assert!(!b.graphics().draws()[0].depth_mask);
        assert_eq!(b.graphics().active_shader(), None);
    }

    // ── flushing ──────────────────────────────────────────────────────────

    #[test]
    fn one_texture_flushes_once_at_end() {
        let mut b = batch(100);
        let t = RecordedTexture::new(8, 8);
        b.begin().unwrap();
        for i in 0..37 {
            b.draw(&t, i as f32, 0.0).unwrap();
        }
        assert_eq!(renders(&b), 0);
        b.end().unwrap();

        let draws = b.graphics().draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].count, 6 * 37);
        assert_eq!(draws[0].units[0], Some(t.id()));
        assert_eq!(b.render_calls(), 1);
        assert_eq!(b.max_sprites_in_batch(), 37);
    }

    #[test]
    fn overflow_quad_triggers_exactly_one_flush() {
        let mut b = batch(4);
        let t = RecordedTexture::new(8, 8);
        b.begin().unwrap();
        for _ in 0..4 {
            b.draw(&t, 0.0, 0.0).unwrap();
        }
        assert_eq!(renders(&b), 0);
        b.draw(&t, 1.0, 1.0).unwrap();
        assert_eq!(renders(&b), 1);
        assert_eq!(b.graphics().draws()[0].count, 24);
        b.end().unwrap();
        assert_eq!(b.graphics().draws()[1].count, 6);
    }

    #[test]
    fn texture_switch_flushes_before_new_vertices() {
        let mut b = batch(100);
        let a = RecordedTexture::new(8, 8);
        let c = RecordedTexture::new(16, 16);
        b.begin().unwrap();
        b.draw(&a, 0.0, 0.0).unwrap();
        b.draw(&a, 10.0, 0.0).unwrap();
        b.draw(&c, 20.0, 0.0).unwrap();
        assert_eq!(renders(&b), 1);
        b.end().unwrap();

        let draws = b.graphics().draws();
        assert_eq!(draws[0].units[0], Some(a.id()));
        assert_eq!(draws[0].vertex_count(), 8);
        assert_eq!(draws[1].units[0], Some(c.id()));
        assert_eq!(draws[1].vertex_count(), 4);
        assert_eq!(draws[1].vertex(0)[0], 20.0);
    }

    #[test]
    fn raw_vertices_split_across_flushes() {
        let mut b = batch(3);
        let t = RecordedTexture::new(8, 8);
        let quads: Vec<f32> = (0..5)
            .flat_map(|i| geometry::rect(i as f32, 0.0, 1.0, 1.0, Uv::FULL, 0.0))
            .collect();
        b.begin().unwrap();
        b.draw_vertices(&t, &quads).unwrap();
        b.end().unwrap();
        let draws = b.graphics().draws();
        assert_eq!(draws.len(), 2);
        assert_eq!((draws[0].count, draws[1].count), (18, 12));
        assert_eq!(draws[1].vertex(0)[0], 3.0);
    }

    #[test]
    fn partial_records_are_rejected() {
        let mut b = batch(3);
        let t = RecordedTexture::new(8, 8);
        b.begin().unwrap();
        assert_eq!(
            b.draw_vertices(&t, &[0.0; 7]),
            Err(BatchError::InvalidVertexData { len: 7, record: 20 })
        );
    }

    // ── state ─────────────────────────────────────────────────────────────

    #[test]
    fn color_is_stamped_into_vertices() {
        let mut b = batch(10);
        let t = RecordedTexture::new(2, 2);
        b.begin().unwrap();
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        b.set_color(red).unwrap();
        assert_eq!(b.packed_color(), red.to_float_bits());
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        let v = b.graphics().draws()[0].vertex(2);
        assert_eq!(v[2].to_bits(), red.to_float_bits().to_bits());
        assert_eq!(b.color().r, 1.0);
    }

    #[test]
    fn color_reads_back_what_was_set() {
        let mut b = batch(10);
        b.begin().unwrap();
        b.set_color(Color::WHITE).unwrap();
        assert_eq!(b.color(), Color::WHITE);

        b.set_color(Color::new(1.0, 1.0, 1.0, 0.5)).unwrap();
        let a = b.color().a;
        assert!((a - 0.5).abs() <= 2.0 / 255.0, "{a}");
        b.end().unwrap();
    }

    #[test]
    fn blend_change_flushes_and_is_issued_once() {
        let mut b = batch(10);
        let t = RecordedTexture::new(2, 2);
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.set_blend_function(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(renders(&b), 0, "unchanged blend must not flush");
        b.set_blend_function(BlendFactor::One, BlendFactor::One);
        assert_eq!(renders(&b), 1);
        b.draw(&t, 0.0, 0.0).unwrap();
        b.flush();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();

        let additive = BlendFunc::new(BlendFactor::One, BlendFactor::One);
        let sets = b.graphics().count(|e| matches!(e, Event::SetBlend(_)));
        // alpha, additive, disable at end
        assert_eq!(sets, 3);
        assert_eq!(b.graphics().draws()[1].blend, Some(additive));
        assert_eq!(b.graphics().draws()[2].blend, Some(additive));
    }

    #[test]
    fn disabled_blending_reaches_the_backend() {
        let mut b = batch(10);
        let t = RecordedTexture::new(2, 2);
        b.disable_blending();
        assert!(!b.is_blending_enabled());
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        assert_eq!(b.graphics().draws()[0].blend, None);
    }

    #[test]
    fn projection_change_flushes_and_uploads() {
        let mut b = batch(10);
        let t = RecordedTexture::new(2, 2);
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        let p = Mat4::from_scale(glam::Vec3::splat(2.0));
        b.set_projection_matrix(p);
        assert_eq!(renders(&b), 1);
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        assert_eq!(b.graphics().draws()[1].proj_trans, Some(p));
        assert_eq!(b.projection_matrix(), p);
    }

    #[test]
    fn transform_is_combined_with_projection() {
        let mut b = batch(10);
        let t = RecordedTexture::new(2, 2);
        let xf = Mat4::from_translation(glam::Vec3::new(5.0, 0.0, 0.0));
        b.set_transform_matrix(xf);
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        let expected = b.projection_matrix() * xf;
        assert_eq!(b.graphics().draws()[0].proj_trans, Some(expected));
    }

    #[test]
    fn custom_shader_round_trip() {
        let mut b = batch(10);
        let t = RecordedTexture::new(2, 2);
        let custom = b.graphics_mut().custom_shader("outline");
        let default_id = b.shader().id;

        assert!(b.set_shader(Some(custom.clone())).is_err());

        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.set_shader(Some(custom.clone())).unwrap();
        assert_eq!(renders(&b), 1);
        assert_eq!(b.graphics().active_shader(), Some(custom.id));
        b.draw(&t, 0.0, 0.0).unwrap();
        b.set_shader(None).unwrap();
        b.end().unwrap();

        let draws = b.graphics().draws();
        assert_eq!(draws[0].shader, default_id);
        assert_eq!(draws[1].shader, custom.id);
        assert!(draws[1].proj_trans.is_some());
        assert_eq!(b.shader().id, default_id);
    }

    #[test]
    fn render_calls_reset_each_frame() {
        let mut b = batch(10);
        let t = RecordedTexture::new(2, 2);
        for _ in 0..3 {
            b.begin().unwrap();
            b.draw(&t, 0.0, 0.0).unwrap();
            b.end().unwrap();
        }
        assert_eq!(b.render_calls(), 1);
        assert_eq!(b.total_render_calls(), 3);
    }

    // ── draw overloads ────────────────────────────────────────────────────

    #[test]
    fn region_draw_uses_region_size_and_uvs() {
        let mut b = batch(10);
        let t = RecordedTexture::new(100, 100);
        let region = TextureRegion::from_pixels(t.clone(), 0, 0, 50, 25);
        b.begin().unwrap();
        b.draw_region(&region, 1.0, 2.0).unwrap();
        b.end().unwrap();
        let d = &b.graphics().draws()[0];
        // top-right corner
        let tr = d.vertex(2);
        assert_eq!((tr[0], tr[1]), (51.0, 27.0));
        assert_eq!((tr[3], tr[4]), (0.5, 0.0));
        // bottom-left samples the region's bottom edge
        assert_eq!(d.vertex(0)[4], 0.25);
    }

    #[test]
    fn dispose_releases_mesh_and_default_shader() {
        let mut b = batch(10);
        let custom = b.graphics_mut().custom_shader("user");
        let default_id = b.shader().id;
        let g = b.dispose();
        assert_eq!(g.count(|e| matches!(e, Event::DisposeMesh(_))), 1);
        assert_eq!(g.count(|e| *e == Event::DisposeShader(default_id)), 1);
        assert_eq!(g.count(|e| *e == Event::DisposeShader(custom.id)), 0);
    }
}
