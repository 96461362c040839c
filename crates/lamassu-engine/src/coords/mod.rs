//! Coordinate types shared by the geometry builder and the backends.
//!
//! Batch space:
//! - world units (pixels under the default projection)
//! - origin bottom-left
//! - +X right, +Y up
//!
//! The default projection maps a [`Viewport`] onto clip space.

mod vec2;
mod viewport;

pub use vec2::Vec2;
pub use viewport::Viewport;
