//! GPU device + surface management.
//!
//! Creates the wgpu adapter, device and queue, configures the window surface
//! and hands out per-frame encoders. The batching layer reaches the device
//! only through [`crate::render::WgpuGraphics`].

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;
