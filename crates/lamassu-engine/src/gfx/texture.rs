use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique texture identity.
///
/// Slot caches key on this, never on pixel contents or dimensions. Ids are
/// never reused within a process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

impl TextureId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A sampled 2D texture as seen by the batches.
///
/// Implementors are cheap handles: cloning must not copy pixels. Batches keep
/// a clone of every texture referenced by unflushed geometry.
pub trait Texture: Clone {
    fn id(&self) -> TextureId;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Minification / magnification filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
    MipMapNearestNearest,
    MipMapLinearNearest,
    MipMapNearestLinear,
    MipMapLinearLinear,
}

impl TextureFilter {
    /// Whether sampling with this filter reads mip levels above 0.
    #[inline]
    pub fn is_mipmap(self) -> bool {
        !matches!(self, Self::Nearest | Self::Linear)
    }

    /// Filter used within a single mip level.
    #[inline]
    pub fn is_linear_within_level(self) -> bool {
        matches!(
            self,
            Self::Linear | Self::MipMapLinearNearest | Self::MipMapLinearLinear
        )
    }

    /// Filter used between mip levels. Meaningless for non-mipmap filters.
    #[inline]
    pub fn is_linear_between_levels(self) -> bool {
        matches!(self, Self::MipMapNearestLinear | Self::MipMapLinearLinear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TextureId::next();
        let b = TextureId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn mipmap_classification() {
        assert!(!TextureFilter::Nearest.is_mipmap());
        assert!(!TextureFilter::Linear.is_mipmap());
        assert!(TextureFilter::MipMapLinearLinear.is_mipmap());
        assert!(TextureFilter::MipMapLinearNearest.is_linear_within_level());
        assert!(!TextureFilter::MipMapLinearNearest.is_linear_between_levels());
    }
}
