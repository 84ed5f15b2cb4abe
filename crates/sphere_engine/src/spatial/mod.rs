//! Spatial indexing on the sphere
//!
//! A hierarchical hexagonal tessellation of the sphere and the cached
//! footprint index built on it.

pub mod footprint;
pub mod hex_grid;

pub use footprint::{FootprintIndex, FootprintStats};
pub use hex_grid::{cell_count, frequency, CellId, CellKind, HexGrid, SpatialError, MAX_RESOLUTION};
