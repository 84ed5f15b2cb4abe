//! Collision resolution dispatch
//!
//! Confirmed pairs are routed to handlers keyed by the ordered
//! `(projectile kind, target kind)` pair. Handlers never touch the pools
//! directly: they record releases and spawns on a [`ResolutionContext`], and
//! the simulation applies those commands after every pair has been handled.

use crate::ecs::{EntityHandle, EntityKind};
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::time::Millis;
use crate::kinematics::rotate_up;
use crate::physics::CollisionPair;
use std::collections::HashMap;

/// Request to place a new entity
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    /// Kind to acquire
    pub kind: EntityKind,
    /// Initial orientation
    pub orientation: Quat,
    /// Local heading for the initial velocity
    pub heading: f64,
    /// Initial angular speed (rad/s), clamped by the kind
    pub speed: f64,
    /// Spawner
    pub owner: Option<EntityHandle>,
}

impl SpawnRequest {
    /// Spawn `kind` at rest with the given orientation
    pub fn at(kind: EntityKind, orientation: Quat) -> Self {
        Self {
            kind,
            orientation,
            heading: 0.0,
            speed: 0.0,
            owner: None,
        }
    }

    /// Set the initial heading and speed
    pub fn moving(mut self, heading: f64, speed: f64) -> Self {
        self.heading = heading;
        self.speed = speed;
        self
    }

    /// Set the spawner
    pub fn owned_by(mut self, owner: EntityHandle) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Deferred pool operation recorded by a handler
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Return an entity to its pool
    Release(EntityHandle),
    /// Acquire and place a new entity
    Spawn(SpawnRequest),
}

/// What a handler can see and request while resolving pairs
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    now: Millis,
    sphere_radius: f64,
    orientations: HashMap<EntityHandle, Quat>,
    commands: Vec<Command>,
}

impl ResolutionContext {
    /// Create a context for one dispatch pass
    pub fn new(now: Millis, sphere_radius: f64, orientations: HashMap<EntityHandle, Quat>) -> Self {
        Self {
            now,
            sphere_radius,
            orientations,
            commands: Vec::new(),
        }
    }

    /// Simulation time of the tick
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Orientation of an entity taking part in this tick's collisions
    pub fn orientation_of(&self, handle: EntityHandle) -> Option<Quat> {
        self.orientations.get(&handle).copied()
    }

    /// Position of an entity taking part in this tick's collisions
    pub fn position_of(&self, handle: EntityHandle) -> Option<Vec3> {
        self.orientations
            .get(&handle)
            .map(|q| rotate_up(q) * self.sphere_radius)
    }

    /// Ask for `handle` to be released after dispatch
    pub fn release(&mut self, handle: EntityHandle) {
        self.commands.push(Command::Release(handle));
    }

    /// Ask for a new entity after dispatch
    pub fn spawn(&mut self, request: SpawnRequest) {
        self.commands.push(Command::Spawn(request));
    }

    /// Commands recorded so far, in order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Take the recorded commands
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

/// Resolution policy for one kind pair
pub trait CollisionHandler {
    /// Resolve one confirmed pair
    fn handle(&mut self, pair: &CollisionPair, ctx: &mut ResolutionContext);
}

impl<F> CollisionHandler for F
where
    F: FnMut(&CollisionPair, &mut ResolutionContext),
{
    fn handle(&mut self, pair: &CollisionPair, ctx: &mut ResolutionContext) {
        self(pair, ctx);
    }
}

/// Outcome of one dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Pairs handed to a handler
    pub dispatched: usize,
    /// Pairs with no handler for their kinds
    pub unmatched: usize,
}

/// Routes pairs to handlers by `(projectile kind, target kind)`
#[derive(Default)]
pub struct CollisionDispatcher {
    handlers: HashMap<(EntityKind, EntityKind), Box<dyn CollisionHandler>>,
    unmatched_total: u64,
}

impl CollisionDispatcher {
    /// Create a dispatcher with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler for `projectile` hitting `target`, returning the
    /// one it replaces
    pub fn register<H>(&mut self, projectile: EntityKind, target: EntityKind, handler: H) -> Option<Box<dyn CollisionHandler>>
    where
        H: CollisionHandler + 'static,
    {
        log::debug!("Registered collision handler for ({projectile}, {target})");
        self.handlers.insert((projectile, target), Box::new(handler))
    }

    /// Whether a handler exists for the kind pair
    pub fn has_handler(&self, projectile: EntityKind, target: EntityKind) -> bool {
        self.handlers.contains_key(&(projectile, target))
    }

    /// Hand every pair to its handler. Pairs without one are logged and
    /// skipped.
    pub fn dispatch(&mut self, pairs: &[CollisionPair], ctx: &mut ResolutionContext) -> DispatchReport {
        let mut report = DispatchReport::default();
        for pair in pairs {
            match self.handlers.get_mut(&pair.kinds()) {
                Some(handler) => {
                    handler.handle(pair, ctx);
                    report.dispatched += 1;
                }
                None => {
                    log::debug!(
                        "No collision handler for ({}, {}); ignoring {} hitting {}",
                        pair.projectile.kind(),
                        pair.target.kind(),
                        pair.projectile,
                        pair.target
                    );
                    report.unmatched += 1;
                }
            }
        }
        self.unmatched_total += report.unmatched as u64;
        report
    }

    /// Unmatched pairs since creation
    pub fn unmatched_total(&self) -> u64 {
        self.unmatched_total
    }
}
