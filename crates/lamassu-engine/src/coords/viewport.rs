use glam::Mat4;

/// Drawable area in world units.
///
/// The batches default their projection to [`Viewport::projection`] of the
/// size they were created for; callers update it on resize.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Orthographic projection with the origin at the bottom-left corner and
    /// one world unit per pixel.
    pub fn projection(self) -> Mat4 {
        let w = self.width.max(1.0);
        let h = self.height.max(1.0);
        Mat4::orthographic_rh(0.0, w, 0.0, h, -1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn projection_maps_corners_to_clip_space() {
        let p = Viewport::new(800.0, 600.0).projection();
        let bl = p * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let tr = p * Vec4::new(800.0, 600.0, 0.0, 1.0);
        assert!((bl.x + 1.0).abs() < 1e-6 && (bl.y + 1.0).abs() < 1e-6);
        assert!((tr.x - 1.0).abs() < 1e-6 && (tr.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_size_is_invalid() {
        assert!(!Viewport::new(0.0, 10.0).is_valid());
        assert!(Viewport::new(1.0, 1.0).is_valid());
    }
}
