use crate::cache::{SlotStats, UnitCache};
use crate::gfx::{Graphics, ShaderKind, Texture, U_TEXTURES};

use super::config::{check_quads, MultiTextureBatchConfig};
use super::core::{forward_batch_state, BatchCore, Bindings, Indices};
use super::error::{BatchError, Result};
use super::facade::Batch;
use super::geometry::{SPRITE_QUAD, SPRITE_VERTEX};
use super::vertices::QUAD_VERTICES;

const SLOTTED_VERTEX: usize = SPRITE_VERTEX + 1;
const SLOTTED_QUAD: usize = QUAD_VERTICES * SLOTTED_VERTEX;

/// Textures resident in each unit.
pub(crate) struct UnitSlots<T> {
    textures: Vec<Option<T>>,
}

impl<T> UnitSlots<T> {
    fn new(units: u32) -> Self {
        Self {
            textures: (0..units).map(|_| None).collect(),
        }
    }

    fn clear(&mut self) {
        self.textures.iter_mut().for_each(|t| *t = None);
    }

    fn units(&self) -> u32 {
        self.textures.len() as u32
    }
}

impl<G: Graphics> Bindings<G> for UnitSlots<G::Texture> {
    fn bind(&mut self, graphics: &mut G) {
        for (unit, texture) in self.textures.iter().enumerate() {
            if let Some(texture) = texture {
                graphics.bind_texture(unit as u32, texture);
            }
        }
    }

    fn setup_uniforms(&self, graphics: &mut G, shader: &G::Shader) {
        let units: Vec<i32> = (0..self.units() as i32).collect();
        graphics.set_uniform_ints(shader, U_TEXTURES, &units);
    }
}

/// Quad batch that samples up to one texture per unit in a single draw call.
///
/// Each vertex carries the unit it samples. Units are assigned per frame by
/// an LFU [`UnitCache`]; evicting a unit that queued geometry still samples
/// flushes first.
pub struct MultiTextureBatch<G: Graphics> {
    core: BatchCore<G>,
    slots: UnitSlots<G::Texture>,
    cache: UnitCache,
}

impl<G: Graphics> MultiTextureBatch<G> {
    pub fn new(graphics: G, config: MultiTextureBatchConfig) -> Result<Self> {
        check_quads(config.max_sprites)?;

        let hardware = graphics.max_texture_units();
        let units = config.max_units.map_or(hardware, |n| n.min(hardware));
        if units == 0 {
            return Err(BatchError::NoTextureUnits);
        }

        let core = BatchCore::new(
            graphics,
            "lamassu multi-texture batch",
            ShaderKind::MultiTexture { units },
            config.max_sprites * QUAD_VERTICES,
            Indices::Quads,
        )?;
        log::debug!("multi-texture batch: {units} of {hardware} units");

        Ok(Self {
            core,
            slots: UnitSlots::new(units),
            cache: UnitCache::new(units),
        })
    }

    /// Units in use.
    #[inline]
    pub fn max_texture_units(&self) -> u32 {
        self.slots.units()
    }

    pub fn slot_stats(&self) -> SlotStats {
        self.cache.stats()
    }

    #[inline]
    pub fn graphics(&self) -> &G {
        &self.core.graphics
    }

    #[inline]
    pub fn graphics_mut(&mut self) -> &mut G {
        &mut self.core.graphics
    }

    pub fn dispose(self) -> G {
        self.core.dispose()
    }

    /// Unit holding `texture`, installing it if needed.
    fn unit_for(&mut self, texture: &G::Texture) -> u32 {
        let acquired = self
            .cache
            .acquire(texture.id(), || self.core.flush(&mut self.slots));
        let unit = acquired.slot();
        if acquired.is_install() {
            self.slots.textures[unit as usize] = Some(texture.clone());
        }
        unit
    }
}

impl<G: Graphics> Batch for MultiTextureBatch<G> {
    type Texture = G::Texture;
    type Shader = G::Shader;

    fn begin(&mut self) -> Result<()> {
        self.core.begin(&self.slots)?;
        self.cache.reset();
        self.slots.clear();
        Ok(())
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

        let unit = self.unit_for(texture) as f32;
        for quad in quads.chunks_exact(SPRITE_QUAD) {
            self.core.ensure_room(SLOTTED_QUAD, 0, &mut self.slots)?;
            let Some(out) = self.core.vertices.reserve(SLOTTED_QUAD) else {
                return Err(BatchError::BatchTooLarge {
                    requested: 1,
                    max: self.core.vertices.capacity() / SLOTTED_QUAD,
                });
            };
            for (dst, src) in out
                .chunks_exact_mut(SLOTTED_VERTEX)
                .zip(quad.chunks_exact(SPRITE_VERTEX))
            {
                dst[..SPRITE_VERTEX].copy_from_slice(src);
                dst[SPRITE_VERTEX] = unit;
            }
        }
        Ok(())
    }

    forward_batch_state!();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::gfx::{Event, RecordedTexture, RecordingGraphics, TextureId};

    fn batch(units: u32, max_sprites: usize) -> MultiTextureBatch<RecordingGraphics> {
        MultiTextureBatch::new(
            RecordingGraphics::new().with_max_texture_units(units),
            MultiTextureBatchConfig {
                max_sprites,
                max_units: None,
            },
        )
        .expect("batch")
    }

    /// Every submitted vertex must sample the texture it was drawn with.
    /// Quads are tagged by drawing texture `i` zero-width at `x = i`.
    fn assert_no_stale_slots(
        b: &MultiTextureBatch<RecordingGraphics>,
        expected: &HashMap<u32, TextureId>,
    ) {
        for (n, draw) in b.graphics().draws().iter().enumerate() {
            for v in 0..draw.vertex_count() {
                let tag = draw.vertex(v)[0] as u32;
                assert_eq!(
                    draw.texture_of(v),
                    Some(expected[&tag]),
                    "draw {n} vertex {v}"
                );
            }
        }
    }

    #[test]
    fn units_are_clamped_to_hardware() {
        let g = RecordingGraphics::new().with_max_texture_units(4);
        let b = MultiTextureBatch::new(
            g,
            MultiTextureBatchConfig {
                max_sprites: 10,
                max_units: Some(16),
            },
        )
        .unwrap();
        assert_eq!(b.max_texture_units(), 4);
        assert_eq!(b.slot_stats().slot_capacity, 4);
    }

    #[test]
    fn no_units_is_an_error() {
        let g = RecordingGraphics::new().with_max_texture_units(0);
        let err = MultiTextureBatch::new(g, MultiTextureBatchConfig::default()).err();
        assert_eq!(err, Some(BatchError::NoTextureUnits));
    }

    #[test]
    fn sampler_array_uniform_lists_every_unit() {
        let mut b = batch(3, 10);
        b.begin().unwrap();
        let expected = vec![0, 1, 2];
        assert_eq!(
            b.graphics()
                .count(|e| matches!(e, Event::UniformInts { values, .. } if *values == expected)),
            1
        );
    }

    #[test]
    fn distinct_textures_share_one_draw() {
        let mut b = batch(4, 100);
        let textures: Vec<_> = (0..4).map(|_| RecordedTexture::new(8, 8)).collect();
        b.begin().unwrap();
        for (i, t) in textures.iter().enumerate() {
            b.draw(t, i as f32, 0.0).unwrap();
        }
        b.end().unwrap();

        let draws = b.graphics().draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].count, 24);
        for (i, t) in textures.iter().enumerate() {
            assert_eq!(draws[0].slot(i * 4), Some(i as u32));
            assert_eq!(draws[0].texture_of(i * 4), Some(t.id()));
        }
    }

    #[test]
    fn hits_do_not_flush() {
        let mut b = batch(2, 100);
        let a = RecordedTexture::new(8, 8);
        let c = RecordedTexture::new(8, 8);
        b.begin().unwrap();
        for _ in 0..10 {
            b.draw(&a, 0.0, 0.0).unwrap();
            b.draw(&c, 0.0, 0.0).unwrap();
        }
        b.end().unwrap();
        assert_eq!(b.graphics().draws().len(), 1);
        assert_eq!(b.slot_stats().eviction_count, 0);
    }

    #[test]
    fn eviction_flushes_before_the_unit_is_reused() {
        let mut b = batch(2, 100);
        let textures: Vec<_> = (0..3).map(|_| RecordedTexture::new(8, 8)).collect();
        let expected: HashMap<u32, TextureId> = textures
            .iter()
            .enumerate()
            .map(|(i, t)| (i as u32, t.id()))
            .collect();

        b.begin().unwrap();
        for round in 0..4 {
            for (i, t) in textures.iter().enumerate() {
                if round % 2 == 0 || i != 1 {
                    b.draw_sized(t, i as f32, 0.0, 0.0, 1.0).unwrap();
                }
            }
        }
        b.end().unwrap();

        assert!(b.graphics().draws().len() > 1);
        assert!(b.slot_stats().eviction_count > 0);
        assert_no_stale_slots(&b, &expected);
    }

    #[test]
    fn frequently_used_texture_keeps_its_unit() {
        let mut b = batch(2, 100);
        let hot = RecordedTexture::new(8, 8);
        let cold: Vec<_> = (0..5).map(|_| RecordedTexture::new(8, 8)).collect();
        b.begin().unwrap();
        for _ in 0..5 {
            b.draw(&hot, 0.0, 0.0).unwrap();
        }
        for t in &cold {
            b.draw(t, 1.0, 0.0).unwrap();
            b.draw(&hot, 0.0, 0.0).unwrap();
        }
        b.end().unwrap();
        for draw in b.graphics().draws() {
            assert_eq!(draw.units[0], Some(hot.id()));
        }
    }

    #[test]
    fn capacity_boundary_flushes_without_eviction() {
        let mut b = batch(2, 3);
        let t = RecordedTexture::new(8, 8);
        b.begin().unwrap();
        for _ in 0..4 {
            b.draw(&t, 0.0, 0.0).unwrap();
        }
        b.end().unwrap();
        let draws = b.graphics().draws();
        assert_eq!((draws[0].count, draws[1].count), (18, 6));
        assert_eq!(draws[1].slot(0), Some(0));
        assert_eq!(b.slot_stats().eviction_count, 0);
    }

    #[test]
    fn units_reset_every_frame() {
        let mut b = batch(2, 100);
        let a = RecordedTexture::new(8, 8);
        let c = RecordedTexture::new(8, 8);
        b.begin().unwrap();
        b.draw(&a, 0.0, 0.0).unwrap();
        b.end().unwrap();

        b.begin().unwrap();
        b.draw(&c, 0.0, 0.0).unwrap();
        b.end().unwrap();
        // first texture of the new frame lands in unit 0 again
        assert_eq!(b.graphics().draws()[1].slot(0), Some(0));
        assert_eq!(b.slot_stats().slot_count, 1);
    }
}
