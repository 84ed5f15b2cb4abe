//! Entity types
//!
//! Entities are plain data owned by the per-kind object pools; systems reach
//! them through [`EntityHandle`]s.

pub mod entity;

pub use entity::{Entity, EntityHandle, EntityKind, Timestamps};
