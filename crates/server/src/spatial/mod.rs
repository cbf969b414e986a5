//! Spatial indexing utilities.
//!
//! Uniform bucket grid, rebuilt every tick.

mod grid;

pub use grid::{Bucket, SpatialIndex};
