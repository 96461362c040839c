/// Combined projection × transform matrix.
pub const U_PROJ_TRANS: &str = "u_projTrans";
/// Texture unit of single-texture shaders.
pub const U_TEXTURE: &str = "u_texture";
/// Texture units of the multi-texture shader, one per slot.
pub const U_TEXTURES: &str = "u_textures";

/// Which built-in program a batch needs, and therefore which texture
/// bindings and vertex layout the backend must provide.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// One 2D texture at unit 0.
    Sprite,
    /// `units` 2D textures; each vertex carries the unit it samples.
    MultiTexture { units: u32 },
    /// One 2D array texture; each vertex carries the layer it samples.
    ArrayTexture,
}

impl ShaderKind {
    /// Vertex layout the program reads.
    pub fn vertex_format(self) -> VertexFormat {
        match self {
            Self::Sprite => VertexFormat::Sprite,
            Self::MultiTexture { .. } | Self::ArrayTexture => VertexFormat::Slotted,
        }
    }
}

/// Per-vertex record layout.
///
/// All attributes are `f32`; the packed color is read back as four
/// normalized bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// `x, y, color, u, v`
    Sprite,
    /// `x, y, color, u, v, slot`
    Slotted,
}

impl VertexFormat {
    /// Floats per vertex.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            Self::Sprite => 5,
            Self::Slotted => 6,
        }
    }

    #[inline]
    pub const fn stride_bytes(self) -> u64 {
        (self.stride() * std::mem::size_of::<f32>()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_variants_use_slotted_layout() {
        assert_eq!(ShaderKind::Sprite.vertex_format().stride(), 5);
        assert_eq!(ShaderKind::ArrayTexture.vertex_format().stride(), 6);
        assert_eq!(ShaderKind::MultiTexture { units: 4 }.vertex_format().stride_bytes(), 24);
    }
}
