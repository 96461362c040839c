/// Blend factor applied to the source or destination term.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturated,
}

/// Separate color/alpha blend function (additive blend equation).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlendFunc {
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendFunc {
    /// Straight-alpha "over".
    pub const ALPHA: Self = Self::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

    /// Same factors for color and alpha.
    #[inline]
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self::separate(src, dst, src, dst)
    }

    #[inline]
    pub const fn separate(
        src_color: BlendFactor,
        dst_color: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> Self {
        Self {
            src_color,
            dst_color,
            src_alpha,
            dst_alpha,
        }
    }
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self::ALPHA
    }
}
