use crate::cache::{LayerCache, SlotStats};
use crate::gfx::{ArrayTextureDesc, Graphics, ShaderKind, Texture, TextureFilter, U_TEXTURE};

use super::config::ArrayTextureBatchConfig;
use super::core::{forward_batch_state, BatchCore, Bindings, Indices};
use super::error::{BatchError, Result};
use super::facade::Batch;
use super::geometry::{SPRITE_QUAD, SPRITE_VERTEX};
use super::vertices::QUAD_VERTICES;

const SLOTTED_VERTEX: usize = SPRITE_VERTEX + 1;
const SLOTTED_QUAD: usize = QUAD_VERTICES * SLOTTED_VERTEX;

/// The array texture plus the layers whose mip chains are stale.
pub(crate) struct LayerSlots<A> {
    array: A,
    dirty: Vec<u32>,
    mipmaps: bool,
}

impl<A> LayerSlots<A> {
    fn mark_dirty(&mut self, layer: u32) {
        if !self.dirty.contains(&layer) {
            self.dirty.push(layer);
        }
    }
}

impl<G: Graphics> Bindings<G> for LayerSlots<G::ArrayTexture> {
    fn bind(&mut self, graphics: &mut G) {
        if self.mipmaps && !self.dirty.is_empty() {
            self.dirty.sort_unstable();
            graphics.generate_mipmaps(&self.array, &self.dirty);
        }
        self.dirty.clear();
        graphics.bind_array_texture(0, &self.array);
    }

    fn setup_uniforms(&self, graphics: &mut G, shader: &G::Shader) {
        graphics.set_uniform_int(shader, U_TEXTURE, 0);
    }
}

/// Quad batch that copies textures into the layers of one array texture and
/// draws them all with a single binding.
///
/// Layer assignment persists across frames through a [`LayerCache`], since
/// every install is a pixel copy. Texture coordinates are rescaled from the
/// source texture to the layer size.
pub struct ArrayTextureBatch<G: Graphics> {
    core: BatchCore<G>,
    slots: LayerSlots<G::ArrayTexture>,
    cache: LayerCache,
    layer_width: u32,
    layer_height: u32,
}

impl<G: Graphics> ArrayTextureBatch<G> {
    pub fn new(graphics: G, config: ArrayTextureBatchConfig) -> Result<Self> {
        config.validate()?;

        let mut core = BatchCore::new(
            graphics,
            "lamassu array-texture batch",
            ShaderKind::ArrayTexture,
            config.max_sprites * QUAD_VERTICES,
            Indices::Quads,
        )?;

        let desc = ArrayTextureDesc {
            label: "lamassu layer array",
            layer_width: config.layer_width,
            layer_height: config.layer_height,
            layers: config.layers,
            mag_filter: config.mag_filter,
            min_filter: config.min_filter,
        };
        let array = match core.graphics.create_array_texture(&desc) {
            Ok(array) => array,
            Err(e) => {
                core.dispose();
                return Err(e);
            }
        };

        log::debug!(
            "array-texture batch: {} layers of {}x{}",
            config.layers,
            config.layer_width,
            config.layer_height
        );

        Ok(Self {
            core,
            slots: LayerSlots {
                array,
                dirty: Vec::with_capacity(config.layers as usize),
                mipmaps: uses_mipmaps(config.mag_filter, config.min_filter),
            },
            cache: LayerCache::new(config.layers),
            layer_width: config.layer_width,
            layer_height: config.layer_height,
        })
    }

    /// Changes the array's sampling filters. Mip chains of every occupied
    /// layer are rebuilt before the next draw if the new filters need them.
    pub fn set_array_texture_filter(&mut self, mag: TextureFilter, min: TextureFilter) {
        self.core.flush_for_binding_change(&mut self.slots);
        self.core
            .graphics
            .set_array_filter(&mut self.slots.array, mag, min);
        self.slots.mipmaps = uses_mipmaps(mag, min);
        for layer in self.cache.occupied() {
            self.slots.mark_dirty(layer);
        }
    }

    /// Layer copies since the last `begin`, fills of free layers included.
    #[inline]
    pub fn install_count(&self) -> u32 {
        self.cache.installs()
    }

    pub fn slot_stats(&self) -> SlotStats {
        self.cache.stats()
    }

    #[inline]
    pub fn array_texture(&self) -> &G::ArrayTexture {
        &self.slots.array
    }

    #[inline]
    pub fn graphics(&self) -> &G {
        &self.core.graphics
    }

    #[inline]
    pub fn graphics_mut(&mut self) -> &mut G {
        &mut self.core.graphics
    }

    /// Releases the array texture, the mesh and the default shader.
    pub fn dispose(self) -> G {
        let Self { mut core, slots, .. } = self;
        core.graphics.dispose_array_texture(slots.array);
        core.dispose()
    }

    /// Layer holding `texture`, copying it in if needed.
    fn layer_for(&mut self, texture: &G::Texture) -> Result<u32> {
        if texture.width() > self.layer_width || texture.height() > self.layer_height {
            return Err(BatchError::TextureTooLarge {
                width: texture.width(),
                height: texture.height(),
                max_width: self.layer_width,
                max_height: self.layer_height,
            });
        }

        let acquired = self
            .cache
            .acquire(texture.id(), || self.core.flush(&mut self.slots));
        let layer = acquired.slot();
        if acquired.is_install() {
            self.core
                .graphics
                .copy_to_layer(&self.slots.array, layer, texture);
            self.slots.mark_dirty(layer);
        }
        Ok(layer)
    }
}

fn uses_mipmaps(mag: TextureFilter, min: TextureFilter) -> bool {
    mag.is_mipmap() || min.is_mipmap()
}

impl<G: Graphics> Batch for ArrayTextureBatch<G> {
    type Texture = G::Texture;
    type Shader = G::Shader;

    fn begin(&mut self) -> Result<()> {
        self.core.begin(&self.slots)?;
        self.cache.begin_frame();
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

        let layer = self.layer_for(texture)? as f32;
        let scale_u = texture.width() as f32 / self.layer_width as f32;
        let scale_v = texture.height() as f32 / self.layer_height as f32;

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
                dst[0] = src[0];
                dst[1] = src[1];
                dst[2] = src[2];
                dst[3] = src[3] * scale_u;
                dst[4] = src[4] * scale_v;
                dst[5] = layer;
            }
        }
        Ok(())
    }

    forward_batch_state!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{Event, RecordedTexture, RecordingGraphics};

    fn config(layers: u32, size: u32) -> ArrayTextureBatchConfig {
        ArrayTextureBatchConfig {
            max_sprites: 100,
            layer_width: size,
            layer_height: size,
            layers,
            ..ArrayTextureBatchConfig::default()
        }
    }

    fn batch(layers: u32, size: u32) -> ArrayTextureBatch<RecordingGraphics> {
        ArrayTextureBatch::new(RecordingGraphics::new(), config(layers, size)).expect("batch")
    }

    fn copies(b: &ArrayTextureBatch<RecordingGraphics>) -> usize {
        b.graphics()
            .count(|e| matches!(e, Event::CopyToLayer { .. }))
    }

    #[test]
    fn invalid_layer_count_is_rejected() {
        let err = ArrayTextureBatch::new(RecordingGraphics::new(), config(0, 16)).err();
        assert!(matches!(err, Some(BatchError::InvalidConfig(_))));
        let err = ArrayTextureBatch::new(RecordingGraphics::new(), config(257, 16)).err();
        assert!(matches!(err, Some(BatchError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let mut b = batch(2, 16);
        let big = RecordedTexture::new(32, 8);
        b.begin().unwrap();
        assert_eq!(
            b.draw(&big, 0.0, 0.0),
            Err(BatchError::TextureTooLarge {
                width: 32,
                height: 8,
                max_width: 16,
                max_height: 16
            })
        );
        assert_eq!(copies(&b), 0);
    }

    #[test]
    fn lfu_scenario_evicts_the_colder_layer() {
        let mut b = batch(2, 2);
        let a = RecordedTexture::new(2, 2);
        let tb = RecordedTexture::new(2, 2);
        let c = RecordedTexture::new(2, 2);

        b.begin().unwrap();
        b.draw(&a, 0.0, 0.0).unwrap();
        b.draw(&tb, 0.0, 0.0).unwrap();
        b.draw(&a, 0.0, 0.0).unwrap();
        assert!(b.graphics().draws().is_empty());
        b.draw(&c, 0.0, 0.0).unwrap();
        assert_eq!(b.graphics().draws().len(), 1, "C miss flushes once");
        b.end().unwrap();

        let draws = b.graphics().draws();
        assert_eq!(draws.len(), 2);

        let first = &draws[0];
        let layers: Vec<_> = (0..3).map(|q| first.slot(q * 4)).collect();
        assert_eq!(layers, vec![Some(0), Some(1), Some(0)]);
        assert_eq!(first.texture_of(0), Some(a.id()));
        assert_eq!(first.texture_of(4), Some(tb.id()));

        let last = &draws[1];
        assert_eq!(last.slot(0), Some(1));
        assert_eq!(last.texture_of(0), Some(c.id()));
        assert_eq!(last.layers[0], Some(a.id()));

        assert_eq!(b.slot_stats().eviction_count, 1);
        assert_eq!(b.install_count(), 3);
    }

    #[test]
    fn layers_persist_across_frames() {
        let mut b = batch(2, 8);
        let a = RecordedTexture::new(8, 8);
        for _ in 0..3 {
            b.begin().unwrap();
            b.draw(&a, 0.0, 0.0).unwrap();
            b.end().unwrap();
        }
        assert_eq!(copies(&b), 1);
        assert_eq!(b.install_count(), 0);
    }

    #[test]
    fn last_frame_favourite_survives_a_cold_frame_start() {
        let mut b = batch(2, 8);
        let hot = RecordedTexture::new(8, 8);
        let warm = RecordedTexture::new(8, 8);
        let newcomer = RecordedTexture::new(8, 8);

        b.begin().unwrap();
        for _ in 0..5 {
            b.draw(&hot, 0.0, 0.0).unwrap();
        }
        b.draw(&warm, 0.0, 0.0).unwrap();
        b.end().unwrap();

        b.begin().unwrap();
        b.draw(&newcomer, 0.0, 0.0).unwrap();
        b.end().unwrap();

        let layers = b.graphics().layers(b.array_texture());
        assert_eq!(layers, vec![Some(hot.id()), Some(newcomer.id())]);
    }

    #[test]
    fn evicting_an_unused_layer_needs_no_flush() {
        let mut b = batch(2, 8);
        let textures: Vec<_> = (0..3).map(|_| RecordedTexture::new(8, 8)).collect();
        b.begin().unwrap();
        b.draw(&textures[0], 0.0, 0.0).unwrap();
        b.draw(&textures[1], 0.0, 0.0).unwrap();
        b.end().unwrap();

        b.begin().unwrap();
        b.draw(&textures[0], 0.0, 0.0).unwrap();
        // layer 1 has not been sampled this frame
        b.draw(&textures[2], 0.0, 0.0).unwrap();
        b.end().unwrap();

        assert_eq!(b.graphics().draws().len(), 2);
        let last = &b.graphics().draws()[1];
        assert_eq!(last.texture_of(0), Some(textures[0].id()));
        assert_eq!(last.texture_of(4), Some(textures[2].id()));
    }

    #[test]
    fn uvs_are_rescaled_to_the_layer() {
        let mut b = batch(2, 16);
        let t = RecordedTexture::new(8, 4);
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        let d = &b.graphics().draws()[0];
        // bottom-left samples (0, 1) of the texture
        assert_eq!(&d.vertex(0)[3..5], &[0.0, 0.25]);
        // top-right samples (1, 0)
        assert_eq!(&d.vertex(2)[3..5], &[0.5, 0.0]);
    }

    #[test]
    fn mipmaps_regenerate_once_per_flush() {
        let mut b = batch(4, 8);
        let textures: Vec<_> = (0..3).map(|_| RecordedTexture::new(8, 8)).collect();
        b.begin().unwrap();
        for t in &textures {
            b.draw(t, 0.0, 0.0).unwrap();
        }
        b.end().unwrap();
        let mips: Vec<_> = b
            .graphics()
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::GenerateMipmaps { layers, .. } => Some(layers.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(mips, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn non_mipmap_filter_skips_generation() {
        let mut b = batch(2, 8);
        let t = RecordedTexture::new(8, 8);
        b.set_array_texture_filter(TextureFilter::Linear, TextureFilter::Linear);
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        assert_eq!(
            b.graphics()
                .count(|e| matches!(e, Event::GenerateMipmaps { .. })),
            0
        );
    }

    #[test]
    fn filter_change_marks_occupied_layers_dirty() {
        let mut b = batch(2, 8);
        let t = RecordedTexture::new(8, 8);
        b.set_array_texture_filter(TextureFilter::Nearest, TextureFilter::Nearest);
        b.begin().unwrap();
        b.draw(&t, 0.0, 0.0).unwrap();
        b.set_array_texture_filter(TextureFilter::Linear, TextureFilter::MipMapLinearLinear);
        assert_eq!(b.graphics().draws().len(), 1);
        b.draw(&t, 0.0, 0.0).unwrap();
        b.end().unwrap();
        let generated = b
            .graphics()
            .count(|e| matches!(e, Event::GenerateMipmaps { layers, .. } if *layers == vec![0]));
        assert_eq!(generated, 1);
    }

    #[test]
    fn dispose_releases_the_array() {
        let b = batch(2, 8);
        let array_id = b.array_texture().id;
        let g = b.dispose();
        assert_eq!(g.count(|e| *e == Event::DisposeArray(array_id)), 1);
        assert_eq!(g.count(|e| matches!(e, Event::DisposeMesh(_))), 1);
    }
}
