//! Physics module for collision detection and response
//!
//! Provides the two-phase collision pipeline and the dispatcher that hands
//! confirmed pairs to resolution handlers.

pub mod collision;
pub mod collision_layers;
pub mod collision_system;
pub mod dispatch;

pub use collision::{BoundingSphere, GeometryError, Outline, Polygon, ShapeTag};
pub use collision_layers::Roles;
pub use collision_system::{Collider, CollisionPair, CollisionPipeline, CollisionStats};
pub use dispatch::{
    CollisionDispatcher, CollisionHandler, Command, DispatchReport, ResolutionContext, SpawnRequest,
};
