use crate::gfx::TextureId;

use super::{Acquired, SlotStats};

/// Counters are rescaled into `0..=NORMALIZED_MAX` on every eviction.
const NORMALIZED_MAX: u64 = 100;

/// LFU assignment of textures to texture units.
///
/// Slots fill in order within a frame; [`UnitCache::reset`] empties the
/// table so each frame's assignment reflects only that frame's accesses.
#[derive(Debug, Clone)]
pub struct UnitCache {
    ids: Vec<TextureId>,
    frequency: Vec<u32>,
    capacity: usize,
    evictions: u64,
}

impl UnitCache {
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity as usize;
        Self {
            ids: Vec::with_capacity(capacity),
            frequency: Vec::with_capacity(capacity),
            capacity,
            evictions: 0,
        }
    }

    /// Forgets every resident texture and counter.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.frequency.clear();
    }

    /// Resolves `id` to a slot.
    ///
    /// On a miss with every slot taken, `before_evict` runs before the
    /// victim is replaced.
    pub fn acquire(&mut self, id: TextureId, before_evict: impl FnOnce()) -> Acquired {
        if let Some(slot) = self.ids.iter().position(|&resident| resident == id) {
            self.frequency[slot] = self.frequency[slot].saturating_add(1);
            return Acquired::Hit(slot as u32);
        }

        if self.ids.len() < self.capacity {
            self.ids.push(id);
            self.frequency.push(1);
            return Acquired::Filled((self.ids.len() - 1) as u32);
        }

        before_evict();

        let victim = self.victim();
        // one above the mean, so a tie does not make the newcomer the next victim
        let seed = self.normalize() + 1;
        let previous = std::mem::replace(&mut self.ids[victim], id);
        self.frequency[victim] = seed;
        self.evictions += 1;

        log::trace!("unit {victim}: evicted {previous:?} for {id:?} (seed {seed})");

        Acquired::Evicted {
            slot: victim as u32,
            previous,
        }
    }

    /// Lowest counter, first slot on ties.
    fn victim(&self) -> usize {
        let mut victim = 0;
        for (slot, &count) in self.frequency.iter().enumerate() {
            if count < self.frequency[victim] {
                victim = slot;
            }
        }
        victim
    }

    /// Rescales every counter into `0..=100` relative to the largest and
    /// returns the mean of the rescaled counters.
    fn normalize(&mut self) -> u32 {
        let max = self.frequency.iter().copied().max().unwrap_or(0) as u64;
        if max == 0 || self.frequency.is_empty() {
            return 1;
        }

        let sum: u64 = self.frequency.iter().map(|&f| f as u64).sum();
        for f in &mut self.frequency {
            *f = (*f as u64 * NORMALIZED_MAX / max) as u32;
        }
        (sum * NORMALIZED_MAX / (max * self.frequency.len() as u64)) as u32
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn frequency(&self, slot: u32) -> Option<u32> {
        self.frequency.get(slot as usize).copied()
    }

    pub fn resident(&self, slot: u32) -> Option<TextureId> {
        self.ids.get(slot as usize).copied()
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            slot_count: self.ids.len() as u32,
            slot_capacity: self.capacity as u32,
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

    fn hit(cache: &mut UnitCache, id: TextureId, times: usize) {
        for _ in 0..times {
            cache.acquire(id, || panic!("no eviction expected"));
        }
    }

    #[test]
    fn same_texture_keeps_its_slot() {
        let t = ids(1);
        let mut cache = UnitCache::new(4);
        assert_eq!(cache.acquire(t[0], || {}), Acquired::Filled(0));
        assert_eq!(cache.acquire(t[0], || {}), Acquired::Hit(0));
        assert_eq!(cache.frequency(0), Some(2));
    }

    #[test]
    fn one_past_capacity_evicts_once_and_calls_back_first() {
        let t = ids(4);
        let mut cache = UnitCache::new(3);
        hit(&mut cache, t[0], 3);
        hit(&mut cache, t[1], 1);
        hit(&mut cache, t[2], 2);

        let mut called = false;
        let got = cache.acquire(t[3], || called = true);
        assert!(called);
        assert_eq!(
            got,
            Acquired::Evicted {
                slot: 1,
                previous: t[1]
            }
        );
        assert_eq!(cache.evictions(), 1);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn ties_go_to_the_lowest_slot() {
        let t = ids(3);
        let mut cache = UnitCache::new(2);
        cache.acquire(t[0], || {});
        cache.acquire(t[1], || {});
        assert_eq!(cache.acquire(t[2], || {}).slot(), 0);
    }

    #[test]
    fn newcomer_is_seeded_above_the_mean() {
        let t = ids(5);
        let mut cache = UnitCache::new(3);
        hit(&mut cache, t[0], 10);
        hit(&mut cache, t[1], 5);
        hit(&mut cache, t[2], 1);

        assert_eq!(cache.acquire(t[3], || {}).slot(), 2);
        assert_eq!(cache.frequency(0), Some(100));
        assert_eq!(cache.frequency(1), Some(50));
        assert_eq!(cache.frequency(2), Some(54));

        // The newcomer outranks the weakest survivor on the next miss.
        assert_eq!(cache.acquire(t[4], || {}).slot(), 1);
    }

    #[test]
    fn alternating_misses_do_not_evict_the_newcomer() {
        let t = ids(3);
        let mut cache = UnitCache::new(2);
        cache.acquire(t[0], || {});
        cache.acquire(t[1], || {});
        assert_eq!(cache.acquire(t[2], || {}).slot(), 0);

        // every counter tied before the miss; the survivor goes instead
        assert_eq!(
            cache.acquire(t[0], || {}),
            Acquired::Evicted {
                slot: 1,
                previous: t[1]
            }
        );
        assert_eq!(cache.resident(0), Some(t[2]));
    }

    #[test]
    fn reset_empties_the_table() {
        let t = ids(2);
        let mut cache = UnitCache::new(2);
        cache.acquire(t[0], || {});
        cache.acquire(t[1], || {});
        cache.reset();
        assert!(cache.is_empty());
        assert_eq!(cache.acquire(t[1], || {}), Acquired::Filled(0));
    }

    #[test]
    fn counters_stay_bounded() {
        let t = ids(3);
        let mut cache = UnitCache::new(2);
        for _ in 0..1000 {
            cache.acquire(t[0], || {});
            cache.acquire(t[1], || {});
            cache.acquire(t[2], || {});
        }
        assert!((0..2).all(|s| cache.frequency(s).is_some_and(|f| f <= 1000)));
    }
}
