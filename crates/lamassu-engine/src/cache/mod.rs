//! Texture-slot caches.
//!
//! Both caches map an unbounded stream of [`TextureId`]s onto a fixed number
//! of slots with least-frequently-used eviction. They hold ids and counters
//! only: binding or copying the texture that lands in a slot is the batch's
//! job, as is flushing geometry before a slot it references is replaced.
//! That flush happens through the `before_evict` callback of `acquire`.

mod layers;
mod units;

pub use layers::LayerCache;
pub use units::UnitCache;

use crate::gfx::TextureId;

/// Result of resolving a texture to a slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// Already resident.
    Hit(u32),
    /// Placed into a free slot.
    Filled(u32),
    /// Replaced the resident of a slot.
    Evicted { slot: u32, previous: TextureId },
}

impl Acquired {
    #[inline]
    pub fn slot(self) -> u32 {
        match self {
            Self::Hit(slot) | Self::Filled(slot) | Self::Evicted { slot, .. } => slot,
        }
    }

    /// Whether the slot's contents changed.
    #[inline]
    pub fn is_install(self) -> bool {
        !matches!(self, Self::Hit(_))
    }
}

/// Occupancy counters of a slot cache.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SlotStats {
    /// Slots currently holding a texture.
    pub slot_count: u32,
    pub slot_capacity: u32,
    /// Evictions over the cache's lifetime.
    pub eviction_count: u64,
}
