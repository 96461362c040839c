use crate::gfx::TextureFilter;

use super::error::{BatchError, Result};
use super::vertices::{MAX_QUADS, MAX_VERTICES};

/// Single-texture sprite batch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteBatchConfig {
    /// Quads buffered before a forced flush. At most 8191.
    pub max_sprites: usize,
}

impl Default for SpriteBatchConfig {
    fn default() -> Self {
        Self { max_sprites: 1000 }
    }
}

/// Polygon batch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolygonBatchConfig {
    /// Vertices buffered before a forced flush. At most 32767.
    pub max_vertices: usize,

    /// Triangles buffered before a forced flush.
    ///
    /// `None` allows two triangles per vertex.
    pub max_triangles: Option<usize>,
}

impl Default for PolygonBatchConfig {
    fn default() -> Self {
        Self {
            max_vertices: 2000,
            max_triangles: None,
        }
    }
}

impl PolygonBatchConfig {
    pub(crate) fn triangle_capacity(&self) -> usize {
        self.max_triangles.unwrap_or(self.max_vertices * 2)
    }
}

/// Multi-unit batch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiTextureBatchConfig {
    /// Quads buffered before a forced flush. At most 8191.
    pub max_sprites: usize,

    /// Upper bound on simultaneously bound textures.
    ///
    /// The effective count is the smaller of this and what the device
    /// reports; `None` uses every unit the device offers.
    pub max_units: Option<u32>,
}

impl Default for MultiTextureBatchConfig {
    fn default() -> Self {
        Self {
            max_sprites: 1000,
            max_units: None,
        }
    }
}

/// Array-layer batch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayTextureBatchConfig {
    /// Quads buffered before a forced flush. At most 8191.
    pub max_sprites: usize,

    /// Per-layer size. Textures drawn through the batch must fit.
    pub layer_width: u32,
    pub layer_height: u32,

    /// Layer count, `1..=256`.
    pub layers: u32,

    pub mag_filter: TextureFilter,
    pub min_filter: TextureFilter,
}

impl Default for ArrayTextureBatchConfig {
    fn default() -> Self {
        Self {
            max_sprites: 1000,
            layer_width: 1024,
            layer_height: 1024,
            layers: 16,
            mag_filter: TextureFilter::Nearest,
            min_filter: TextureFilter::MipMapLinearLinear,
        }
    }
}

impl ArrayTextureBatchConfig {
    pub const MAX_LAYERS: u32 = 256;

    pub(crate) fn validate(&self) -> Result<()> {
        check_quads(self.max_sprites)?;
        if self.layer_width == 0 || self.layer_height == 0 {
            return Err(BatchError::InvalidConfig(format!(
                "array layer size {}x{} must be non-zero",
                self.layer_width, self.layer_height
            )));
        }
        if !(1..=Self::MAX_LAYERS).contains(&self.layers) {
            return Err(BatchError::InvalidConfig(format!(
                "array layer count {} outside 1..={}",
                self.layers,
                Self::MAX_LAYERS
            )));
        }
        Ok(())
    }
}

pub(crate) fn check_quads(requested: usize) -> Result<()> {
    if requested > MAX_QUADS {
        return Err(BatchError::BatchTooLarge {
            requested,
            max: MAX_QUADS,
        });
    }
    if requested == 0 {
        return Err(BatchError::InvalidConfig("batch needs room for at least one quad".into()));
    }
    Ok(())
}

pub(crate) fn check_vertices(requested: usize) -> Result<()> {
    if requested > MAX_VERTICES {
        return Err(BatchError::BatchTooLarge {
            requested,
            max: MAX_VERTICES,
        });
    }
    if requested < 4 {
        return Err(BatchError::InvalidConfig(
            "polygon batch needs room for at least four vertices".into(),
        ));
    }
    Ok(())
}
