/// Straight-alpha RGBA color, components in `[0, 1]`.
///
/// Batches never send this struct to the GPU directly. Each vertex carries the
/// color as a single packed `f32` (see [`Color::to_float_bits`]) which the
/// vertex layout reads back as `Unorm8x4`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Packed form of [`Color::WHITE`].
pub const WHITE_FLOAT_BITS: f32 = f32::from_bits(0xfeff_ffff);

/// Alpha's lowest bit is always cleared in packed colors.
///
/// `0xff` in the top byte together with a non-zero mantissa is a NaN bit
/// pattern; masking keeps every packed color a finite float.
const PACKED_MASK: u32 = 0xfeff_ffff;

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const CLEAR: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from 8-bit channels.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Packs into `0xAABBGGRR` (red in the lowest byte).
    ///
    /// Channels are clamped to `[0, 1]` and truncated, not rounded.
    #[inline]
    pub fn to_abgr8888(self) -> u32 {
        let ch = |v: f32| (255.0 * v.clamp(0.0, 1.0)) as u32;
        ch(self.a) << 24 | ch(self.b) << 16 | ch(self.g) << 8 | ch(self.r)
    }

    /// Packs the color into a float for use as a single vertex attribute.
    ///
    /// Little-endian byte order of the float is `r, g, b, a`, matching a
    /// `Unorm8x4` attribute. Alpha loses its lowest bit; the default shaders
    /// rescale alpha by `255/254` to compensate.
    #[inline]
    pub fn to_float_bits(self) -> f32 {
        f32::from_bits(self.to_abgr8888() & PACKED_MASK)
    }

    /// Decodes a packed color produced by [`to_float_bits`](Self::to_float_bits).
    ///
    /// Alpha is rescaled by `255/254` like the default shaders do, so a packed
    /// alpha byte of `0xfe` decodes to exactly `1.0`.
    #[inline]
    pub fn from_float_bits(packed: f32) -> Self {
        let bits = packed.to_bits();
        Self::new(
            (bits & 0xff) as f32 / 255.0,
            ((bits >> 8) & 0xff) as f32 / 255.0,
            ((bits >> 16) & 0xff) as f32 / 255.0,
            (((bits >> 24) & 0xff) as f32 / 254.0).min(1.0),
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1.0 / 255.0 + f32::EPSILON
    }

    #[test]
    fn white_packs_to_constant() {
        assert_eq!(Color::WHITE.to_float_bits().to_bits(), WHITE_FLOAT_BITS.to_bits());
    }

    #[test]
    fn red_occupies_lowest_byte() {
        assert_eq!(Color::new(1.0, 0.0, 0.0, 0.0).to_abgr8888(), 0x0000_00ff);
        assert_eq!(Color::new(0.0, 0.0, 0.0, 1.0).to_abgr8888(), 0xff00_0000);
    }

    #[test]
    fn packed_color_is_never_nan() {
        for a in [0u8, 1, 127, 254, 255] {
            for r in [0u8, 1, 255] {
                let packed = Color::from_rgba8(r, 255, 255, a).to_float_bits();
                assert!(!packed.is_nan(), "a={a} r={r}");
            }
        }
    }

    #[test]
    fn decode_recovers_channels_within_one_step() {
        let c = Color::new(0.25, 0.5, 0.75, 0.5);
        let d = Color::from_float_bits(c.to_float_bits());
        assert!(close(d.r, c.r));
        assert!(close(d.g, c.g));
        assert!(close(d.b, c.b));
        // alpha loses its low bit, one extra step
        assert!((d.a - c.a).abs() <= 2.0 / 255.0, "{}", d.a);
    }

    #[test]
    fn opaque_and_transparent_decode_exactly() {
        for c in [Color::WHITE, Color::BLACK, Color::CLEAR] {
            assert_eq!(Color::from_float_bits(c.to_float_bits()), c);
        }
        assert_eq!(Color::from_float_bits(WHITE_FLOAT_BITS), Color::WHITE);
    }

    #[test]
    fn out_of_range_channels_are_clamped() {
        let c = Color::new(2.0, -1.0, 0.0, 1.0);
        assert_eq!(c.to_abgr8888() & 0xff, 0xff);
        assert_eq!((c.to_abgr8888() >> 8) & 0xff, 0);
    }
}
