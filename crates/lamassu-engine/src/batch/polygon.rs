use crate::gfx::{Graphics, PolygonRegion, ShaderKind};

use super::config::{check_vertices, PolygonBatchConfig};
use super::core::{forward_batch_state, BatchCore, Indices};
use super::error::{BatchError, Result};
use super::facade::Batch;
use super::geometry::{self, Placement, SPRITE_QUAD, SPRITE_VERTEX};
use super::sprite::SingleTexture;

const QUAD_PATTERN: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Batch of arbitrary triangulated geometry from a single texture.
///
/// Vertices and triangle indices are buffered together; either running out
/// forces a flush. Quads drawn through [`Batch`] are split into two
/// triangles.
pub struct PolygonBatch<G: Graphics> {
    core: BatchCore<G>,
    slots: SingleTexture<G::Texture>,
}

impl<G: Graphics> PolygonBatch<G> {
    pub fn new(graphics: G, config: PolygonBatchConfig) -> Result<Self> {
        check_vertices(config.max_vertices)?;
        let index_capacity = config.triangle_capacity() * 3;
        if index_capacity < QUAD_PATTERN.len() {
            return Err(BatchError::InvalidConfig(
                "polygon batch needs room for at least two triangles".into(),
            ));
        }
        let core = BatchCore::new(
            graphics,
            "lamassu polygon batch",
            ShaderKind::Sprite,
            config.max_vertices,
            Indices::Triangles {
                list: Vec::with_capacity(index_capacity),
                capacity: index_capacity,
            },
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

    /// Largest vertex count submitted in one draw call.
    pub fn max_vertices_in_batch(&self) -> u32 {
        self.core.stats().max_vertices_in_batch
    }

    pub fn dispose(self) -> G {
        self.core.dispose()
    }

    // ── polygon draws ─────────────────────────────────────────────────────

    /// Region at its pixel size with its bottom-left at `(x, y)`.
    pub fn draw_polygon_region(
        &mut self,
        region: &PolygonRegion<G::Texture>,
        x: f32,
        y: f32,
    ) -> Result<()> {
        let r = region.region();
        let placement = Placement::rect(x, y, r.region_width() as f32, r.region_height() as f32);
        self.write_polygon("draw_polygon_region", region, &placement)
    }

    /// Region stretched to `width × height`.
    pub fn draw_polygon_region_sized(
        &mut self,
        region: &PolygonRegion<G::Texture>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        let placement = Placement::rect(x, y, width, height);
        self.write_polygon("draw_polygon_region_sized", region, &placement)
    }

    /// Region placed with origin, scale and rotation.
    pub fn draw_polygon_region_transformed(
        &mut self,
        region: &PolygonRegion<G::Texture>,
        placement: &Placement,
    ) -> Result<()> {
        self.write_polygon("draw_polygon_region_transformed", region, placement)
    }

    /// Raw triangles: `vertices` holds `x, y, packed color, u, v` records,
    /// `triangles` indexes into them.
    pub fn draw_triangles(
        &mut self,
        texture: &G::Texture,
        vertices: &[f32],
        triangles: &[u16],
    ) -> Result<()> {
        self.core.check_draw("draw_triangles")?;
        if vertices.len() % SPRITE_VERTEX != 0 {
            return Err(BatchError::InvalidVertexData {
                len: vertices.len(),
                record: SPRITE_VERTEX,
            });
        }
        let count = vertices.len() / SPRITE_VERTEX;
        if let Some(bad) = triangles.iter().find(|&&i| i as usize >= count) {
            return Err(BatchError::InvalidConfig(format!(
                "triangle index {bad} out of range for {count} vertices"
            )));
        }

        self.switch_texture(texture);
        self.core.ensure_room(vertices.len(), triangles.len(), &mut self.slots)?;
        let base = self.core.base_vertex();
        self.core.vertices.push(vertices);
        self.core.push_triangles(base, triangles);
        Ok(())
    }

    fn write_polygon(
        &mut self,
        op: &'static str,
        region: &PolygonRegion<G::Texture>,
        placement: &Placement,
    ) -> Result<()> {
        self.core.check_draw(op)?;
        self.switch_texture(region.region().texture());

        let floats = region.vertex_count() * SPRITE_VERTEX;
        let triangles = region.triangles();
        self.core.ensure_room(floats, triangles.len(), &mut self.slots)?;

        let color = self.core.packed_color();
        let base = self.core.base_vertex();
        let r = region.region();
        let Some(out) = self.core.vertices.reserve(floats) else {
            return Err(BatchError::BatchTooLarge {
                requested: region.vertex_count(),
                max: self.core.vertices.capacity() / SPRITE_VERTEX,
            });
        };
        geometry::polygon_into(
            out,
            region.vertices(),
            region.texture_coords(),
            (r.region_width(), r.region_height()),
            placement,
            color,
        );
        self.core.push_triangles(base, triangles);
        Ok(())
    }

    fn switch_texture(&mut self, texture: &G::Texture) {
        if self.slots.is_current(texture) {
            return;
        }
        self.core.flush(&mut self.slots);
        self.slots.set(texture);
    }
}

impl<G: Graphics> Batch for PolygonBatch<G> {
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
        for quad in quads.chunks_exact(SPRITE_QUAD) {
            self.core.ensure_room(SPRITE_QUAD, QUAD_PATTERN.len(), &mut self.slots)?;
            let base = self.core.base_vertex();
            self.core.vertices.push(quad);
            self.core.push_triangles(base, &QUAD_PATTERN);
        }
        Ok(())
    }

    forward_batch_state!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{Event, RecordedTexture, RecordingGraphics, Texture, TextureRegion};

    fn batch(max_vertices: usize) -> PolygonBatch<RecordingGraphics> {
        PolygonBatch::new(
            RecordingGraphics::new(),
            PolygonBatchConfig {
                max_vertices,
                max_triangles: None,
            },
        )
        .expect("batch")
    }

    /// Unit square split into two triangles, over the whole texture.
    fn square(texture: RecordedTexture) -> PolygonRegion<RecordedTexture> {
        PolygonRegion::new(
            TextureRegion::new(texture),
            vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 10.0, 0.0],
            vec![0, 1, 2, 2, 3, 0],
        )
        .expect("region")
    }

    #[test]
    fn rejects_out_of_range_capacity() {
        let g = RecordingGraphics::new();
        let cfg = PolygonBatchConfig {
            max_vertices: 40_000,
            max_triangles: None,
        };
        assert!(matches!(
            PolygonBatch::new(g, cfg).err(),
            Some(BatchError::BatchTooLarge { requested: 40_000, max: 32767 })
        ));
    }

    #[test]
    fn polygon_indices_are_offset_per_draw() {
        let mut b = batch(100);
        let t = RecordedTexture::new(10, 10);
        let region = square(t);
        b.begin().unwrap();
        b.draw_polygon_region(&region, 0.0, 0.0).unwrap();
        b.draw_polygon_region(&region, 20.0, 0.0).unwrap();
        b.end().unwrap();

        let d = &b.graphics().draws()[0];
        assert_eq!(d.count, 12);
        assert_eq!(d.indices, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(d.vertex_count(), 8);
        assert_eq!(d.vertex(4)[0], 20.0);
        assert_eq!(b.max_vertices_in_batch(), 8);
    }

    #[test]
    fn polygon_texture_coords_follow_region() {
        let mut b = batch(100);
        let t = RecordedTexture::new(10, 10);
        let region = square(t);
        b.begin().unwrap();
        b.draw_polygon_region_sized(&region, 0.0, 0.0, 40.0, 20.0).unwrap();
        b.end().unwrap();
        let d = &b.graphics().draws()[0];
        // bottom-left maps to the region's bottom edge
        assert_eq!(&d.vertex(0)[3..5], &[0.0, 1.0]);
        // top-right corner is scaled to the requested size
        assert_eq!(&d.vertex(2)[0..2], &[40.0, 20.0]);
        assert_eq!(&d.vertex(2)[3..5], &[1.0, 0.0]);
    }

    #[test]
    fn vertex_capacity_forces_flush() {
        let mut b = batch(6);
        let t = RecordedTexture::new(10, 10);
        let region = square(t);
        b.begin().unwrap();
        b.draw_polygon_region(&region, 0.0, 0.0).unwrap();
        assert!(b.graphics().draws().is_empty());
        b.draw_polygon_region(&region, 0.0, 0.0).unwrap();
        assert_eq!(b.graphics().draws().len(), 1);
        b.end().unwrap();
        let draws = b.graphics().draws();
        assert_eq!(draws.len(), 2);
        // indices restart from zero after the flush
        assert_eq!(draws[1].indices, vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn triangle_capacity_forces_flush() {
        let mut b = PolygonBatch::new(
            RecordingGraphics::new(),
            PolygonBatchConfig {
                max_vertices: 100,
                max_triangles: Some(3),
            },
        )
        .unwrap();
        let t = RecordedTexture::new(10, 10);
        let region = square(t);
        b.begin().unwrap();
        b.draw_polygon_region(&region, 0.0, 0.0).unwrap();
        b.draw_polygon_region(&region, 0.0, 0.0).unwrap();
        b.end().unwrap();
        assert_eq!(b.graphics().draws().len(), 2);
    }

    #[test]
    fn oversized_polygon_is_rejected() {
        let mut b = batch(4);
        let t = RecordedTexture::new(10, 10);
        let region = PolygonRegion::new(
            TextureRegion::new(t),
            vec![0.0; 10],
            vec![0, 1, 2, 2, 3, 4],
        )
        .unwrap();
        b.begin().unwrap();
        assert!(matches!(
            b.draw_polygon_region(&region, 0.0, 0.0),
            Err(BatchError::BatchTooLarge { .. })
        ));
    }

    #[test]
    fn sprites_become_two_triangles() {
        let mut b = batch(100);
        let t = RecordedTexture::new(8, 8);
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.draw(&t, 8.0, 0.0).unwrap();
        b.end().unwrap();
        let d = &b.graphics().draws()[0];
        assert_eq!(d.indices, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(d.units[0], Some(t.id()));
    }

    #[test]
    fn raw_triangles_are_validated() {
        let mut b = batch(100);
        let t = RecordedTexture::new(8, 8);
        let verts = [0.0_f32; 15];
        b.begin().unwrap();
        assert!(b.draw_triangles(&t, &verts, &[0, 1, 3]).is_err());
        assert!(matches!(
            b.draw_triangles(&t, &verts[..14], &[0, 1, 2]),
            Err(BatchError::InvalidVertexData { len: 14, record: 5 })
        ));
        b.draw_triangles(&t, &verts, &[0, 1, 2]).unwrap();
        b.end().unwrap();
        assert_eq!(b.graphics().draws()[0].count, 3);
    }

    #[test]
    fn texture_switch_flushes() {
        let mut b = batch(100);
        let a = square(RecordedTexture::new(10, 10));
        let c = square(RecordedTexture::new(10, 10));
        b.begin().unwrap();
        b.draw_polygon_region(&a, 0.0, 0.0).unwrap();
        b.draw_polygon_region(&c, 0.0, 0.0).unwrap();
        b.end().unwrap();
        let draws = b.graphics().draws();
        assert_eq!(draws.len(), 2);
        assert_ne!(draws[0].units[0], draws[1].units[0]);
    }

    #[test]
    fn indices_uploaded_per_flush() {
        let mut b = batch(100);
        let t = RecordedTexture::new(8, 8);
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        let uploads = b
            .graphics()
            .count(|e| matches!(e, Event::UploadIndices { count: 6, .. }));
        assert_eq!(uploads, 1);
    }
}
