/// Vertices per quad.
pub const QUAD_VERTICES: usize = 4;
/// Indices per quad.
pub const QUAD_INDICES: usize = 6;
/// Largest quad count addressable with 16-bit indices.
pub const MAX_QUADS: usize = 32767 / QUAD_VERTICES;
/// Largest vertex count addressable with 16-bit indices.
pub const MAX_VERTICES: usize = 32767;

/// Fixed-capacity arena of fixed-stride vertex records.
///
/// The cursor never passes the capacity: [`VertexBuffer::push`] refuses a
/// record that does not fit and leaves the arena untouched.
#[derive(Debug, Clone)]
pub struct VertexBuffer {
    data: Vec<f32>,
    len: usize,
    stride: usize,
}

impl VertexBuffer {
    /// Room for `max_vertices` records of `stride` floats.
    pub fn new(max_vertices: usize, stride: usize) -> Self {
        Self {
            data: vec![0.0; max_vertices * stride],
            len: 0,
            stride,
        }
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Capacity in floats.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Floats written since the last clear.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.len / self.stride
    }

    /// Floats still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.len
    }

    #[inline]
    pub fn fits(&self, floats: usize) -> bool {
        floats <= self.remaining()
    }

    /// Appends `record` if it fits. Returns whether it was written.
    pub fn push(&mut self, record: &[f32]) -> bool {
        if !self.fits(record.len()) {
            return false;
        }
        let end = self.len + record.len();
        self.data[self.len..end].copy_from_slice(record);
        self.len = end;
        true
    }

    /// Reserves `floats` at the cursor and hands them out for writing.
    pub fn reserve(&mut self, floats: usize) -> Option<&mut [f32]> {
        if !self.fits(floats) {
            return None;
        }
        let start = self.len;
        self.len += floats;
        Some(&mut self.data[start..self.len])
    }

    /// The written range `[0, len)`.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Index list for `quads` quads: `{0, 1, 2, 2, 3, 0}` per quad, offset by
/// the quad's base vertex.
pub fn quad_indices(quads: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(quads * QUAD_INDICES);
    for quad in 0..quads {
        let base = (quad * QUAD_VERTICES) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_refuses_overflow() {
        let mut vb = VertexBuffer::new(2, 5);
        assert!(vb.push(&[1.0; 5]));
        assert!(vb.push(&[2.0; 5]));
        assert!(!vb.push(&[3.0; 5]));
        assert_eq!(vb.len(), 10);
        assert_eq!(vb.vertex_count(), 2);
        assert_eq!(vb.remaining(), 0);
        vb.clear();
        assert!(vb.is_empty());
    }

    #[test]
    fn reserve_hands_out_the_cursor_range() {
        let mut vb = VertexBuffer::new(4, 6);
        vb.push(&[0.0; 6]);
        let slot = vb.reserve(6).expect("room");
        slot.fill(7.0);
        assert_eq!(&vb.as_slice()[6..], &[7.0; 6]);
        assert!(vb.reserve(13).is_none());
    }

    #[test]
    fn quad_index_pattern() {
        assert_eq!(quad_indices(2), vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
    }

    #[test]
    fn largest_batch_fits_u16() {
        let indices = quad_indices(MAX_QUADS);
        assert_eq!(MAX_QUADS, 8191);
        assert_eq!(indices.iter().copied().max(), Some(32763));
    }
}
