//! Collision geometry
//!
//! # Architecture
//!
//! - **Model Space Storage**: outlines are stored as tangent-plane offsets at
//!   the reference pole
//! - **On-Demand Transformation**: outlines are lifted onto the sphere only
//!   when a pair reaches the narrow phase, then cached for the tick
//! - **Shared Projection**: both outlines of a pair are projected into one
//!   gnomonic plane before clipping
//!
//! # Module Organization
//!
//! - [`primitives`] - Bounding spheres
//! - [`polygon`] - Planar polygons, clipping and point-in-polygon
//! - [`outline`] - Model-space outlines, world-space lifting and projection

pub mod primitives;
pub mod polygon;
pub mod outline;

// Re-export commonly used types
pub use primitives::BoundingSphere;
pub use polygon::{polygons_intersect, GeometryError, Polygon};
pub use outline::{project_pair, Outline, OutlineCache, ProjectionFrame, ShapeTag, WorldOutline};
