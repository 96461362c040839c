use crate::batch::BatchError;

use super::texture::Texture;

/// Texture coordinates placed on a quad.
///
/// `(u, v)` lands on the bottom-left corner and `(u2, v2)` on the top-right
/// one. Texture space has `v = 0` on the first uploaded row (the top of the
/// image), so a full, unflipped texture is [`Uv::FULL`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Uv {
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
}

impl Uv {
    pub const FULL: Self = Self::new(0.0, 1.0, 1.0, 0.0);

    #[inline]
    pub const fn new(u: f32, v: f32, u2: f32, v2: f32) -> Self {
        Self { u, v, u2, v2 }
    }

    /// Coordinates of a pixel rectangle of a `texture_width`×`texture_height`
    /// texture. `src.y` counts down from the top row.
    pub fn from_source(texture_width: u32, texture_height: u32, src: SourceRect) -> Self {
        let inv_w = 1.0 / texture_width.max(1) as f32;
        let inv_h = 1.0 / texture_height.max(1) as f32;
        Self {
            u: src.x as f32 * inv_w,
            v: (src.y + src.height) as f32 * inv_h,
            u2: (src.x + src.width) as f32 * inv_w,
            v2: src.y as f32 * inv_h,
        }
    }

    /// Swaps `u/u2` and/or `v/v2`.
    #[inline]
    pub fn flipped(self, flip_x: bool, flip_y: bool) -> Self {
        let mut out = self;
        if flip_x {
            std::mem::swap(&mut out.u, &mut out.u2);
        }
        if flip_y {
            std::mem::swap(&mut out.v, &mut out.v2);
        }
        out
    }
}

impl Default for Uv {
    fn default() -> Self {
        Self::FULL
    }
}

/// Pixel rectangle inside a texture, y counted from the top row.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SourceRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SourceRect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// Rectangular area of a texture in normalized coordinates.
///
/// `(u, v)` is the top-left corner in texture space, `(u2, v2)` the
/// bottom-right one. Flipping swaps a pair, so `u > u2` means flipped on X.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRegion<T> {
    texture: T,
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
    region_width: u32,
    region_height: u32,
}

impl<T: Texture> TextureRegion<T> {
    /// Region covering the whole texture.
    pub fn new(texture: T) -> Self {
        let (w, h) = (texture.width() as i32, texture.height() as i32);
        Self::from_pixels(texture, 0, 0, w, h)
    }

    /// Region from a pixel rectangle.
    ///
    /// Negative sizes produce a flipped region.
    pub fn from_pixels(texture: T, x: i32, y: i32, width: i32, height: i32) -> Self {
        let inv_w = 1.0 / texture.width().max(1) as f32;
        let inv_h = 1.0 / texture.height().max(1) as f32;
        let mut region = Self::from_uv(
            texture,
            x as f32 * inv_w,
            y as f32 * inv_h,
            (x + width) as f32 * inv_w,
            (y + height) as f32 * inv_h,
        );
        region.region_width = width.unsigned_abs();
        region.region_height = height.unsigned_abs();
        region
    }

    pub fn from_uv(texture: T, u: f32, v: f32, u2: f32, v2: f32) -> Self {
        let mut region = Self {
            texture,
            u: 0.0,
            v: 0.0,
            u2: 1.0,
            v2: 1.0,
            region_width: 0,
            region_height: 0,
        };
        region.set_uv(u, v, u2, v2);
        region
    }

    /// Replaces the coordinates and recomputes the pixel size.
    pub fn set_uv(&mut self, mut u: f32, mut v: f32, mut u2: f32, mut v2: f32) {
        let tex_w = self.texture.width().max(1) as f32;
        let tex_h = self.texture.height().max(1) as f32;
        self.region_width = ((u2 - u).abs() * tex_w).round() as u32;
        self.region_height = ((v2 - v).abs() * tex_h).round() as u32;

        // Sample the texel center of single-texel regions so filtering cannot
        // pull in neighbours.
        if self.region_width == 1 && self.region_height == 1 {
            let adjust_x = 0.25 / tex_w;
            u += adjust_x;
            u2 -= adjust_x;
            let adjust_y = 0.25 / tex_h;
            v += adjust_y;
            v2 -= adjust_y;
        }

        self.u = u;
        self.v = v;
        self.u2 = u2;
        self.v2 = v2;
    }

    pub fn flip(&mut self, x: bool, y: bool) {
        if x {
            std::mem::swap(&mut self.u, &mut self.u2);
        }
        if y {
            std::mem::swap(&mut self.v, &mut self.v2);
        }
    }

    #[inline]
    pub fn is_flip_x(&self) -> bool {
        self.u > self.u2
    }

    #[inline]
    pub fn is_flip_y(&self) -> bool {
        self.v > self.v2
    }

    #[inline]
    pub fn texture(&self) -> &T {
        &self.texture
    }

    #[inline]
    pub fn region_width(&self) -> u32 {
        self.region_width
    }

    #[inline]
    pub fn region_height(&self) -> u32 {
        self.region_height
    }

    /// Coordinates as placed on a quad: the region's bottom edge (`v2`) goes
    /// on the quad's bottom corners.
    #[inline]
    pub fn quad_uv(&self) -> Uv {
        Uv::new(self.u, self.v2, self.u2, self.v)
    }
}

/// A region drawn as an arbitrary triangulated polygon.
///
/// `vertices` are x/y pairs in region pixels, origin at the region's
/// bottom-left. Texture coordinates are derived once at construction.
#[derive(Debug, Clone)]
pub struct PolygonRegion<T> {
    region: TextureRegion<T>,
    vertices: Vec<f32>,
    texture_coords: Vec<f32>,
    triangles: Vec<u16>,
}

impl<T: Texture> PolygonRegion<T> {
    pub fn new(
        region: TextureRegion<T>,
        vertices: Vec<f32>,
        triangles: Vec<u16>,
    ) -> Result<Self, BatchError> {
        if vertices.len() % 2 != 0 {
            return Err(BatchError::InvalidConfig(format!(
                "polygon vertices must be x/y pairs, got {} floats",
                vertices.len()
            )));
        }
        if triangles.len() % 3 != 0 {
            return Err(BatchError::InvalidConfig(format!(
                "polygon triangle list length {} is not a multiple of 3",
                triangles.len()
            )));
        }
        let count = vertices.len() / 2;
        if let Some(bad) = triangles.iter().find(|&&i| i as usize >= count) {
            return Err(BatchError::InvalidConfig(format!(
                "triangle index {bad} out of range for {count} vertices"
            )));
        }

        let u = region.u;
        let v = region.v;
        let uv_width = region.u2 - u;
        let uv_height = region.v2 - v;
        let width = region.region_width().max(1) as f32;
        let height = region.region_height().max(1) as f32;

        let texture_coords = vertices
            .chunks_exact(2)
            .flat_map(|p| {
                [
                    u + uv_width * (p[0] / width),
                    v + uv_height * (1.0 - p[1] / height),
                ]
            })
            .collect();

        Ok(Self {
            region,
            vertices,
            texture_coords,
            triangles,
        })
    }

    #[inline]
    pub fn region(&self) -> &TextureRegion<T> {
        &self.region
    }

    #[inline]
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    #[inline]
    pub fn texture_coords(&self) -> &[f32] {
        &self.texture_coords
    }

    #[inline]
    pub fn triangles(&self) -> &[u16] {
        &self.triangles
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }
}
