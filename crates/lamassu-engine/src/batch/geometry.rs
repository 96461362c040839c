//! Corner and texture-coordinate math shared by every batch.
//!
//! Pure arithmetic: functions here produce sprite records (4 vertices of
//! `x, y, color, u, v`, corners ordered bottom-left, top-left, top-right,
//! bottom-right) and never touch the GPU.

use glam::Affine2;

use crate::coords::Vec2;
use crate::gfx::Uv;

/// Floats per sprite vertex.
pub const SPRITE_VERTEX: usize = 5;
/// Floats per sprite quad.
pub const SPRITE_QUAD: usize = 4 * SPRITE_VERTEX;

/// One quad of sprite records.
pub type Quad = [f32; SPRITE_QUAD];

/// Position, size and transform of a quad.
///
/// Scale and rotation (counter-clockwise degrees) are applied around
/// `(x + origin_x, y + origin_y)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
}

impl Placement {
    /// Untransformed rectangle.
    #[inline]
    pub const fn rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            origin_x: 0.0,
            origin_y: 0.0,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }

    #[inline]
    pub const fn origin(mut self, origin_x: f32, origin_y: f32) -> Self {
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        self
    }

    #[inline]
    pub const fn scale(mut self, scale_x: f32, scale_y: f32) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    #[inline]
    pub const fn rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    /// Origin placed at the rectangle's center.
    #[inline]
    pub const fn centered(self) -> Self {
        let (w, h) = (self.width, self.height);
        self.origin(w * 0.5, h * 0.5)
    }
}

/// Corner positions for a placement, in vertex order.
///
/// The fourth corner is derived from the other three so the quad stays a
/// parallelogram under rotation.
pub fn corners(p: &Placement) -> [Vec2; 4] {
    let world_origin = Vec2::new(p.x + p.origin_x, p.y + p.origin_y);

    let mut local_min = Vec2::new(-p.origin_x, -p.origin_y);
    let mut local_max = Vec2::new(p.width - p.origin_x, p.height - p.origin_y);
    if p.scale_x != 1.0 || p.scale_y != 1.0 {
        local_min = local_min.scaled(p.scale_x, p.scale_y);
        local_max = local_max.scaled(p.scale_x, p.scale_y);
    }

    let p1 = local_min;
    let p2 = Vec2::new(local_min.x, local_max.y);
    let p3 = local_max;

    let (c1, c2, c3, c4) = if p.rotation != 0.0 {
        let (sin, cos) = p.rotation.to_radians().sin_cos();
        let c1 = p1.rotated(cos, sin);
        let c2 = p2.rotated(cos, sin);
        let c3 = p3.rotated(cos, sin);
        let c4 = Vec2::new(c1.x + (c3.x - c2.x), c3.y - (c2.y - c1.y));
        (c1, c2, c3, c4)
    } else {
        (p1, p2, p3, Vec2::new(local_max.x, local_min.y))
    };

    [
        c1 + world_origin,
        c2 + world_origin,
        c3 + world_origin,
        c4 + world_origin,
    ]
}

/// Per-corner texture coordinates of an axis-aligned mapping.
#[inline]
pub fn corner_uvs(uv: Uv) -> [[f32; 2]; 4] {
    [[uv.u, uv.v], [uv.u, uv.v2], [uv.u2, uv.v2], [uv.u2, uv.v]]
}

/// Writes four corners into a sprite quad.
pub fn write_quad(positions: [Vec2; 4], uvs: [[f32; 2]; 4], color: f32) -> Quad {
    let mut out = [0.0; SPRITE_QUAD];
    for (i, (p, t)) in positions.iter().zip(uvs.iter()).enumerate() {
        let v = &mut out[i * SPRITE_VERTEX..(i + 1) * SPRITE_VERTEX];
        v[0] = p.x;
        v[1] = p.y;
        v[2] = color;
        v[3] = t[0];
        v[4] = t[1];
    }
    out
}

/// Axis-aligned rectangle.
pub fn rect(x: f32, y: f32, width: f32, height: f32, uv: Uv, color: f32) -> Quad {
    let fx2 = x + width;
    let fy2 = y + height;
    let positions = [
        Vec2::new(x, y),
        Vec2::new(x, fy2),
        Vec2::new(fx2, fy2),
        Vec2::new(fx2, y),
    ];
    write_quad(positions, corner_uvs(uv), color)
}

/// Full quad builder: origin, scale, rotation, then optional UV flips.
pub fn quad(p: &Placement, uv: Uv, flip_x: bool, flip_y: bool, color: f32) -> Quad {
    write_quad(corners(p), corner_uvs(uv.flipped(flip_x, flip_y)), color)
}

/// Region rotated by 90° in texture space, on top of `p`'s own rotation.
///
/// `u, v, u2, v2` are the region's texture-space corners (top-left to
/// bottom-right).
pub fn rotated90(p: &Placement, u: f32, v: f32, u2: f32, v2: f32, clockwise: bool, color: f32) -> Quad {
    let uvs = if clockwise {
        [[u2, v2], [u, v2], [u, v], [u2, v]]
    } else {
        [[u, v], [u2, v], [u2, v2], [u, v2]]
    };
    write_quad(corners(p), uvs, color)
}

/// `width × height` rectangle mapped through an affine transform.
pub fn affine(width: f32, height: f32, transform: &Affine2, uv: Uv, color: f32) -> Quad {
    let map = |x: f32, y: f32| {
        let p = transform.transform_point2(glam::Vec2::new(x, y));
        Vec2::new(p.x, p.y)
    };
    let positions = [
        map(0.0, 0.0),
        map(0.0, height),
        map(width, height),
        map(width, 0.0),
    ];
    write_quad(positions, corner_uvs(uv), color)
}

/// Appends polygon vertices, scaled from region pixels to `width × height`
/// and transformed like [`corners`].
///
/// `region_vertices` are x/y pairs, `texture_coords` the matching u/v pairs.
pub fn polygon_into(
    out: &mut [f32],
    region_vertices: &[f32],
    texture_coords: &[f32],
    region_size: (u32, u32),
    p: &Placement,
    color: f32,
) {
    let sx = p.width / region_size.0.max(1) as f32;
    let sy = p.height / region_size.1.max(1) as f32;
    let world_origin = Vec2::new(p.x + p.origin_x, p.y + p.origin_y);
    let (sin, cos) = p.rotation.to_radians().sin_cos();

    let points = region_vertices.chunks_exact(2).zip(texture_coords.chunks_exact(2));
    for (v, (pos, tc)) in out.chunks_exact_mut(SPRITE_VERTEX).zip(points) {
        let local = Vec2::new(
            (pos[0] * sx - p.origin_x) * p.scale_x,
            (pos[1] * sy - p.origin_y) * p.scale_y,
        );
        let world = local.rotated(cos, sin) + world_origin;
        v[0] = world.x;
        v[1] = world.y;
        v[2] = color;
        v[3] = tc[0];
        v[4] = tc[1];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(q: &Quad) -> [(f32, f32); 4] {
        let mut out = [(0.0, 0.0); 4];
        for (i, o) in out.iter_mut().enumerate() {
            *o = (q[i * SPRITE_VERTEX], q[i * SPRITE_VERTEX + 1]);
        }
        out
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-4 && (a.1 - b.1).abs() < 1e-4
    }

    #[test]
    fn identity_placement_reproduces_rectangle() {
        let q = quad(&Placement::rect(10.0, 20.0, 30.0, 40.0), Uv::FULL, false, false, 0.0);
        assert_eq!(
            positions(&q),
            [(10.0, 20.0), (10.0, 60.0), (40.0, 60.0), (40.0, 20.0)]
        );
        assert_eq!(q, rect(10.0, 20.0, 30.0, 40.0, Uv::FULL, 0.0));
    }

    #[test]
    fn flip_x_only_swaps_u() {
        let uv = Uv::new(0.1, 0.9, 0.6, 0.2);
        let p = Placement::rect(0.0, 0.0, 4.0, 4.0);
        let plain = quad(&p, uv, false, false, 1.5);
        let flipped = quad(&p, uv, true, false, 1.5);
        for i in 0..4 {
            let a = &plain[i * SPRITE_VERTEX..(i + 1) * SPRITE_VERTEX];
            let b = &flipped[i * SPRITE_VERTEX..(i + 1) * SPRITE_VERTEX];
            assert_eq!(&a[..3], &b[..3]);
            assert_eq!(a[4], b[4]);
            let swapped = if a[3] == 0.1 { 0.6 } else { 0.1 };
            assert_eq!(b[3], swapped);
        }
    }

    #[test]
    fn rotation_is_counter_clockwise_about_origin() {
        let p = Placement::rect(0.0, 0.0, 2.0, 2.0).centered().rotation(90.0);
        let c = corners(&p);
        // Bottom-left corner (-1,-1) around (1,1) goes to (1,-1) local.
        assert!(close((c[0].x, c[0].y), (2.0, 0.0)));
        assert!(close((c[2].x, c[2].y), (0.0, 2.0)));
    }

    #[test]
    fn rotated_quad_stays_a_parallelogram() {
        let p = Placement::rect(3.0, 7.0, 13.0, 5.0)
            .origin(2.0, 1.0)
            .scale(1.5, 0.5)
            .rotation(33.3);
        let c = corners(&p);
        let d1 = c[3] - c[0];
        let d2 = c[2] - c[1];
        assert!(close((d1.x, d1.y), (d2.x, d2.y)));
    }

    #[test]
    fn scale_is_applied_around_origin() {
        let p = Placement::rect(0.0, 0.0, 2.0, 2.0).centered().scale(2.0, 2.0);
        let c = corners(&p);
        assert!(close((c[0].x, c[0].y), (-1.0, -1.0)));
        assert!(close((c[2].x, c[2].y), (3.0, 3.0)));
    }

    #[test]
    fn affine_translation_only() {
        let t = Affine2::from_translation(glam::Vec2::new(5.0, 6.0));
        let q = affine(2.0, 3.0, &t, Uv::FULL, 0.0);
        assert_eq!(positions(&q), [(5.0, 6.0), (5.0, 9.0), (7.0, 9.0), (7.0, 6.0)]);
    }

    #[test]
    fn clockwise_rotation_moves_uvs() {
        let p = Placement::rect(0.0, 0.0, 1.0, 1.0);
        let q = rotated90(&p, 0.0, 0.0, 1.0, 1.0, true, 0.0);
        assert_eq!((q[3], q[4]), (1.0, 1.0));
        assert_eq!((q[8], q[9]), (0.0, 1.0));
    }

    #[test]
    fn polygon_scales_region_pixels() {
        let verts = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0];
        let tcs = [0.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        let mut out = [0.0; 3 * SPRITE_VERTEX];
        polygon_into(&mut out, &verts, &tcs, (10, 10), &Placement::rect(1.0, 2.0, 20.0, 5.0), 0.0);
        assert!(close((out[5], out[6]), (21.0, 2.0)));
        assert!(close((out[10], out[11]), (21.0, 7.0)));
        assert_eq!((out[13], out[14]), (1.0, 0.0));
    }
}
