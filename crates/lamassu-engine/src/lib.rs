//! Lamassu engine crate.
//!
//! Batched 2D quad rendering: the batches in [`batch`] accumulate textured
//! geometry and submit it through a [`gfx::Graphics`] backend in as few draw
//! calls as the hardware limits allow. [`render`] holds the wgpu backend and
//! the remaining modules carry the window/GPU runtime used to drive it.

pub mod batch;
pub mod cache;
pub mod gfx;

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod paint;
