//! # Sphere Engine
//!
//! Simulation core for arcade games played on the surface of a sphere.
//!
//! ## Features
//!
//! - **Spherical Kinematics**: Positions live in unit quaternions; motion is an
//!   angular velocity integrated on the sphere
//! - **Hex Footprint Index**: Hierarchical hexagonal cells with cached
//!   footprint queries
//! - **Two-Phase Collisions**: Bounding-sphere broad phase, polygon narrow
//!   phase, and pluggable per-kind resolution handlers
//! - **Object Pools**: LRU idle stores with deferred disposal
//!
//! ## Quick Start
//!
//! ```rust
//! use sphere_engine::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     let mut sim = Simulation::new(SimulationConfig::default())?;
//!     sim.register_handler(EntityKind::Bullet, EntityKind::Rock, |pair: &CollisionPair, ctx: &mut ResolutionContext| {
//!         ctx.release(pair.target);
//!         ctx.release(pair.projectile);
//!     });
//!
//!     let rock = sim.acquire(EntityKind::Rock, None)?;
//!     sim.set_heading(rock, 0.5, 0.2)?;
//!
//!     for _ in 0..60 {
//!         sim.step(16.0)?;
//!     }
//!     assert!((sim.position_of(rock)?.norm() - sim.sphere_radius()).abs() < 1e-9);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core modules
pub mod config;
pub mod core;

pub mod foundation;
pub mod kinematics;
pub mod pool;
pub mod ecs;
pub mod physics;
pub mod spatial;

mod simulation;

#[cfg(test)]
mod tests;

pub use simulation::{Simulation, SimulationError, TickReport};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        Simulation, SimulationError, TickReport,
        foundation::{
            math::{Quat, Vec3, UP},
            time::Millis,
        },
        kinematics::{from_lat_lng, rotate_up, SphericalMotion},
        ecs::{Entity, EntityHandle, EntityKind},
        physics::{CollisionPair, ResolutionContext, Roles, SpawnRequest},
        pool::{PoolStats, SlotId},
        spatial::{CellId, HexGrid},
        core::config::{Config, KindConfig, SimulationConfig},
    };
}
