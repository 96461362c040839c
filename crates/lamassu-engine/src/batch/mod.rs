//! Sprite batching.
//!
//! Every variant implements [`Batch`]: geometry is queued between `begin` and
//! `end` and submitted in as few draw calls as the buffer capacity and the
//! texture-binding model allow.
//!
//! - [`SpriteBatch`]: one texture per draw call
//! - [`PolygonBatch`]: arbitrary triangles, one texture per draw call
//! - [`MultiTextureBatch`]: one texture per unit, slot assigned per vertex
//! - [`ArrayTextureBatch`]: textures copied into array layers

mod array_texture;
mod config;
mod core;
mod error;
mod facade;
pub mod geometry;
mod multi_texture;
mod polygon;
mod sprite;
mod state;
mod vertices;

pub use array_texture::ArrayTextureBatch;
pub use config::{
    ArrayTextureBatchConfig, MultiTextureBatchConfig, PolygonBatchConfig, SpriteBatchConfig,
};
pub use self::core::BatchStats;
pub use error::{BatchError, Result};
pub use facade::Batch;
pub use geometry::Placement;
pub use multi_texture::MultiTextureBatch;
pub use polygon::PolygonBatch;
pub use sprite::SpriteBatch;
pub use state::{Action, DrawState, StateChange};
pub use vertices::{quad_indices, VertexBuffer, MAX_QUADS, MAX_VERTICES, QUAD_INDICES, QUAD_VERTICES};

pub use crate::cache::SlotStats;
