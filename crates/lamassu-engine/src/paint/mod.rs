//! Color model used by the batches.
//!
//! Colors are kept straight-alpha on the CPU and packed into one float per
//! vertex when geometry is written.

pub mod color;

pub use color::{Color, WHITE_FLOAT_BITS};
