use crate::gfx::TextureId;

use super::{Acquired, SlotStats};

/// LFU assignment of textures to array-texture layers.
///
/// Unlike [`UnitCache`](super::UnitCache) the table survives across frames,
/// since filling a layer means copying pixels. Each layer keeps two
/// counters: accesses this frame and accesses last frame. Eviction picks the
/// layer with the fewest previous-frame accesses, then the fewest
/// current-frame ones, first layer on ties.
#[derive(Debug, Clone)]
pub struct LayerCache {
    ids: Vec<Option<TextureId>>,
    current: Vec<u32>,
    previous: Vec<u32>,
    evictions: u64,
    installs: u32,
}

impl LayerCache {
    pub fn new(layers: u32) -> Self {
        let layers = layers as usize;
        Self {
            ids: vec![None; layers],
            current: vec![0; layers],
            previous: vec![0; layers],
            evictions: 0,
            installs: 0,
        }
    }

    /// Starts a new frame: this frame's counts become last frame's.
    pub fn begin_frame(&mut self) {
        self.previous.copy_from_slice(&self.current);
        self.current.fill(0);
        self.installs = 0;
    }

    /// Resolves `id` to a layer.
    ///
    /// On a miss with every layer taken, `before_evict` runs before the
    /// victim is replaced, but only if the victim was sampled this frame:
    /// a layer unused since `begin_frame` cannot be referenced by queued
    /// geometry.
    pub fn acquire(&mut self, id: TextureId, before_evict: impl FnOnce()) -> Acquired {
        if let Some(layer) = self.find(id) {
            self.current[layer] = self.current[layer].saturating_add(1);
            return Acquired::Hit(layer as u32);
        }

        if let Some(layer) = self.ids.iter().position(Option::is_none) {
            self.ids[layer] = Some(id);
            self.current[layer] = 1;
            self.installs += 1;
            return Acquired::Filled(layer as u32);
        }

        let victim = self.victim();
        if self.current[victim] > 0 {
            before_evict();
        }

        let (previous_seed, current_seed) = self.seeds();
        let previous = self.ids[victim].replace(id);
        self.previous[victim] = previous_seed;
        self.current[victim] = current_seed;
        self.evictions += 1;
        self.installs += 1;

        log::trace!(
            "layer {victim}: evicted {previous:?} for {id:?} (seed {previous_seed}/{current_seed})"
        );

        match previous {
            Some(previous) => Acquired::Evicted {
                slot: victim as u32,
                previous,
            },
            None => Acquired::Filled(victim as u32),
        }
    }

    fn find(&self, id: TextureId) -> Option<usize> {
        self.ids.iter().position(|&resident| resident == Some(id))
    }

    /// Lexicographic minimum of `(previous, current)`, stopping at the first
    /// layer unused in both frames.
    fn victim(&self) -> usize {
        let mut victim = 0;
        let mut best = (u32::MAX, u32::MAX);
        for (layer, key) in self.previous.iter().zip(&self.current).enumerate() {
            let key = (*key.0, *key.1);
            if key < best {
                best = key;
                victim = layer;
                if key == (0, 0) {
                    break;
                }
            }
        }
        victim
    }

    /// Mean counters for a newcomer, so it is not the very next victim.
    /// The current-frame seed is at least one access (the one installing it).
    fn seeds(&self) -> (u32, u32) {
        let n = self.ids.len().max(1) as u64;
        let mean = |counts: &[u32]| (counts.iter().map(|&c| c as u64).sum::<u64>() / n) as u32;
        (mean(&self.previous), mean(&self.current).max(1))
    }

    /// Layers holding a texture.
    pub fn occupied(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids
            .iter()
            .enumerate()
            .filter_map(|(layer, id)| id.map(|_| layer as u32))
    }

    pub fn resident(&self, layer: u32) -> Option<TextureId> {
        self.ids.get(layer as usize).copied().flatten()
    }

    /// `(previous, current)` access counts of a layer.
    pub fn counts(&self, layer: u32) -> Option<(u32, u32)> {
        let layer = layer as usize;
        Some((*self.previous.get(layer)?, *self.current.get(layer)?))
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Layer copies since the last `begin_frame`, fills included.
    #[inline]
    pub fn installs(&self) -> u32 {
        self.installs
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            slot_count: self.ids.iter().filter(|id| id.is_some()).count() as u32,
            slot_capacity: self.ids.len() as u32,
            eviction_count: self.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<TextureId> {
        (0..n).map(|_| TextureId::next()).collect()
    }

    #[test]
    fn lowest_current_count_loses_within_a_frame() {
        let t = ids(3);
        let mut cache = LayerCache::new(2);
        cache.begin_frame();
        assert_eq!(cache.acquire(t[0], || {}), Acquired::Filled(0));
        assert_eq!(cache.acquire(t[1], || {}), Acquired::Filled(1));
        assert_eq!(cache.acquire(t[0], || {}), Acquired::Hit(0));

        let mut flushed = 0;
        let got = cache.acquire(t[2], || flushed += 1);
        assert_eq!(flushed, 1);
        assert_eq!(
            got,
            Acquired::Evicted {
                slot: 1,
                previous: t[1]
            }
        );
        assert_eq!(cache.installs(), 3);
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn table_survives_frames() {
        let t = ids(1);
        let mut cache = LayerCache::new(2);
        cache.begin_frame();
        cache.acquire(t[0], || {});
        cache.begin_frame();
        assert_eq!(cache.acquire(t[0], || {}), Acquired::Hit(0));
        assert_eq!(cache.installs(), 0);
        assert_eq!(cache.counts(0), Some((1, 1)));
    }

    #[test]
    fn last_frame_favourite_outlives_a_single_use() {
        let t = ids(3);
        let mut cache = LayerCache::new(2);
        cache.begin_frame();
        for _ in 0..5 {
            cache.acquire(t[0], || {});
        }
        cache.acquire(t[1], || {});

        cache.begin_frame();
        cache.acquire(t[1], || {});
        // t0 unused this frame but hot last frame; t1 was cold last frame.
        assert_eq!(cache.acquire(t[2], || {}).slot(), 1);
    }

    #[test]
    fn unused_victim_needs_no_flush() {
        let t = ids(3);
        let mut cache = LayerCache::new(2);
        cache.begin_frame();
        cache.acquire(t[0], || {});
        cache.acquire(t[1], || {});
        cache.begin_frame();
        cache.begin_frame();
        let mut flushed = false;
        assert_eq!(cache.acquire(t[2], || flushed = true).slot(), 0);
        assert!(!flushed);
    }

    #[test]
    fn newcomer_is_not_the_next_victim() {
        let t = ids(4);
        let mut cache = LayerCache::new(2);
        cache.begin_frame();
        for _ in 0..5 {
            cache.acquire(t[0], || {});
            cache.acquire(t[1], || {});
        }

        cache.begin_frame();
        assert_eq!(cache.acquire(t[2], || {}).slot(), 0);
        assert_eq!(cache.acquire(t[3], || {}).slot(), 1);
        assert_eq!(cache.resident(0), Some(t[2]));
    }

    #[test]
    fn occupied_lists_filled_layers() {
        let t = ids(1);
        let mut cache = LayerCache::new(3);
        cache.acquire(t[0], || {});
        assert_eq!(cache.occupied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(cache.stats().slot_count, 1);
    }
}
