//! # Simulation Context
//!
//! [`Simulation`] owns everything that lives across ticks: the per-kind
//! entity pools, the simulation clock, the footprint index, the collision
//! pipeline and the handler dispatcher. Nothing here is global; two
//! simulations never share caches or counters.
//!
//! ## Tick Order
//!
//! [`Simulation::step`] runs in a fixed order:
//!
//! 1. Validate every active entity (no mutation happens if this fails)
//! 2. Advance the clock and reset the per-tick outline cache
//! 3. Integrate kinematics
//! 4. Refresh footprints of kinds indexed every tick
//! 5. Detect collisions and dispatch them to handlers
//! 6. Queue releases for entities past their lifetime
//! 7. Apply the releases and spawns requested in steps 5 and 6
//! 8. Drain the disposal queues

use crate::core::config::{ConfigError, KindConfig, SimulationConfig};
use crate::ecs::{Entity, EntityHandle, EntityKind, Timestamps};
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::time::{Millis, SimClock, Stopwatch};
use crate::physics::{
    Collider, CollisionDispatcher, CollisionHandler, CollisionPair, CollisionPipeline, CollisionStats, Command,
    DispatchReport, Outline, ResolutionContext, SpawnRequest,
};
use crate::pool::{DrainReport, ObjectPool, PoolError, PoolStats, SlotId};
use crate::spatial::{CellId, FootprintIndex, FootprintStats, SpatialError};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

/// Top-level simulation errors
#[derive(Error, Debug)]
pub enum SimulationError {
    /// A kind was used that has no pool
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Entity state that must never occur
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Pool bookkeeping error
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Configuration file or value error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Hex grid error
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

/// What one [`Simulation::step`] did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Tick number, starting at 1
    pub tick: u64,
    /// Simulation time after the tick
    pub now: Millis,
    /// Entities integrated
    pub integrated: usize,
    /// Footprints refreshed
    pub footprints: usize,
    /// Confirmed collision pairs
    pub collisions: usize,
    /// Handler dispatch outcome
    pub dispatch: DispatchReport,
    /// Entities released for outliving their lifetime
    pub expired: usize,
    /// Entities released in total
    pub released: usize,
    /// Entities spawned by handlers
    pub spawned: usize,
    /// Disposal drained at the end of the tick
    pub disposals: DrainReport,
    /// Wall time spent in the tick
    pub elapsed: Duration,
}

/// Simulation context
pub struct Simulation {
    config: SimulationConfig,
    clock: SimClock,
    pools: HashMap<EntityKind, ObjectPool<Entity>>,
    footprints: FootprintIndex,
    pipeline: CollisionPipeline,
    dispatcher: CollisionDispatcher,
    collisions: Vec<CollisionPair>,
}

impl Simulation {
    /// Build a simulation with one pool per enabled kind
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        log::info!("Creating simulation on a sphere of radius {}", config.sphere_radius);

        let mut pools = HashMap::new();
        for kind in EntityKind::ALL {
            let kind_config = config.kind(kind);
            if kind_config.enabled {
                pools.insert(kind, Self::build_pool(kind, kind_config)?);
            }
        }

        Ok(Self {
            clock: SimClock::new(),
            footprints: FootprintIndex::new(config.sphere_radius, &config.footprint),
            pipeline: CollisionPipeline::new(config.sphere_radius),
            dispatcher: CollisionDispatcher::new(),
            collisions: Vec::new(),
            pools,
            config,
        })
    }

    fn build_pool(kind: EntityKind, config: &KindConfig) -> Result<ObjectPool<Entity>, PoolError> {
        let max_speed = config.max_speed;
        let radius = config.footprint_radius;
        let outline = match kind {
            EntityKind::Ship => Some(Outline::ship(radius)),
            EntityKind::Rock => Some(Outline::rock(radius)),
            _ => None,
        };

        ObjectPool::builder(kind.name(), config.pool_max_size)
            .factory(move |id| {
                let entity = Entity::new(EntityHandle::new(kind, id), max_speed, radius);
                match &outline {
                    Some(outline) => entity.with_outline(outline.clone()),
                    None => entity,
                }
            })
            .reset(Entity::reset)
            .dispose(|entity: Entity| {
                log::trace!("Disposing {}", entity.handle());
                Ok(())
            })
            .build()
    }

    fn pool(&self, kind: EntityKind) -> Result<&ObjectPool<Entity>, SimulationError> {
        self.pools
            .get(&kind)
            .ok_or_else(|| SimulationError::ConfigurationError(format!("no pool configured for {kind}")))
    }

    fn pool_mut(&mut self, kind: EntityKind) -> Result<&mut ObjectPool<Entity>, SimulationError> {
        self.pools
            .get_mut(&kind)
            .ok_or_else(|| SimulationError::ConfigurationError(format!("no pool configured for {kind}")))
    }

    /// Configuration the simulation was built with
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Radius of the playing sphere
    pub fn sphere_radius(&self) -> f64 {
        self.config.sphere_radius
    }

    /// Current simulation time
    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    /// Ticks completed
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Install the resolution handler for `projectile` hitting `target`
    pub fn register_handler<H>(&mut self, projectile: EntityKind, target: EntityKind, handler: H)
    where
        H: CollisionHandler + 'static,
    {
        if self.dispatcher.register(projectile, target, handler).is_some() {
            log::debug!("Replaced collision handler for ({projectile}, {target})");
        }
    }

    /// Check out an entity of `kind`, preferring the idle one under `key`.
    ///
    /// The entity starts at the pole, at rest, stamped with the current time
    /// and its kind's invulnerability window.
    pub fn acquire(&mut self, kind: EntityKind, key: Option<SlotId>) -> Result<EntityHandle, SimulationError> {
        let now = self.clock.now();
        let invulnerability = self.config.kind(kind).invulnerability_ms;
        let pool = self.pool_mut(kind)?;
        let slot = pool.acquire(key.as_ref());
        let entity = pool.get_mut(slot).ok_or_else(|| {
            SimulationError::InvariantViolation(format!("{kind}{slot} missing right after acquisition"))
        })?;

        entity.timestamps = Timestamps::spawned_at(now);
        entity.timestamps.invulnerable_until = invulnerability.map(|window| now + window);
        if kind.is_projectile_class() {
            entity.timestamps.fired_at = Some(now);
        }
        Ok(entity.handle())
    }

    /// Return an entity to its pool
    pub fn release(&mut self, handle: EntityHandle) -> Result<(), SimulationError> {
        self.pool_mut(handle.kind())?.release(handle.slot())?;
        Ok(())
    }

    /// Borrow an active entity
    pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
        self.pools.get(&handle.kind())?.get(handle.slot())
    }

    /// Mutably borrow an active entity
    pub fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.pools.get_mut(&handle.kind())?.get_mut(handle.slot())
    }

    fn active_entity(&self, handle: EntityHandle) -> Result<&Entity, SimulationError> {
        self.entity(handle)
            .ok_or_else(|| SimulationError::InvariantViolation(format!("{handle} is not active")))
    }

    /// World-space position of an active entity
    pub fn position_of(&self, handle: EntityHandle) -> Result<Vec3, SimulationError> {
        Ok(self.active_entity(handle)?.position(self.config.sphere_radius))
    }

    /// Orientation of an active entity
    pub fn orientation_of(&self, handle: EntityHandle) -> Result<Quat, SimulationError> {
        Ok(*self.active_entity(handle)?.orientation())
    }

    /// Aim an active entity along a local heading at `speed` (rad/s)
    pub fn set_heading(&mut self, handle: EntityHandle, heading: f64, speed: f64) -> Result<(), SimulationError> {
        let entity = self
            .entity_mut(handle)
            .ok_or_else(|| SimulationError::InvariantViolation(format!("{handle} is not active")))?;
        entity.motion.set_heading(heading, speed);
        Ok(())
    }

    /// Cells at `resolution` covered by an active entity's footprint.
    ///
    /// Answers come from the kind's memo and may lag behind the entity while
    /// it stays in the same coarse cell.
    pub fn footprint_cells(&mut self, handle: EntityHandle, resolution: u8) -> Result<HashSet<CellId>, SimulationError> {
        let entity = self.active_entity(handle)?;
        let position = entity.position(self.config.sphere_radius);
        let radius = entity.footprint_radius();
        Ok(self
            .footprints
            .footprint_cells(handle.kind(), &position, radius, resolution)?)
    }

    /// Pairs confirmed by the last tick, each projectile at most once
    pub fn collisions_this_tick(&self) -> &[CollisionPair] {
        &self.collisions
    }

    /// Pairs that started colliding in the last tick
    pub fn collisions_entered(&self) -> Vec<CollisionPair> {
        self.pipeline.collision_entered()
    }

    /// Counters of the last collision pass
    pub fn collision_stats(&self) -> CollisionStats {
        self.pipeline.stats()
    }

    /// Footprint cache counters
    pub fn footprint_stats(&self) -> FootprintStats {
        self.footprints.stats()
    }

    /// Counters and gauges of the pool for `kind`
    pub fn pool_stats(&self, kind: EntityKind) -> Result<PoolStats, SimulationError> {
        Ok(self.pool(kind)?.stats())
    }

    /// Active handles of `kind` in slot order
    pub fn active_handles(&self, kind: EntityKind) -> Vec<EntityHandle> {
        self.pools
            .get(&kind)
            .map(|pool| {
                pool.active_ids()
                    .into_iter()
                    .map(|slot| EntityHandle::new(kind, slot))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check every active entity before anything is mutated
    pub fn validate(&self) -> Result<(), SimulationError> {
        for kind in EntityKind::ALL {
            let Some(pool) = self.pools.get(&kind) else { continue };
            let roles = self.config.kind(kind).roles;
            for (_, entity) in pool.iter_active() {
                if !entity.motion.is_finite() {
                    return Err(SimulationError::InvariantViolation(format!(
                        "{} has a non-finite orientation or velocity",
                        entity.handle()
                    )));
                }
                if (entity.orientation().coords.norm() - 1.0).abs() > 1e-6 {
                    return Err(SimulationError::InvariantViolation(format!(
                        "{} has a non-unit orientation",
                        entity.handle()
                    )));
                }
                if !kind.is_projectile_class() && !roles.is_empty() && entity.outline.is_none() {
                    return Err(SimulationError::InvariantViolation(format!(
                        "{} collides but has no outline",
                        entity.handle()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Advance the simulation by `dt` milliseconds
    pub fn step(&mut self, dt: Millis) -> Result<TickReport, SimulationError> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(SimulationError::InvariantViolation(format!("tick length {dt} ms")));
        }
        self.validate()?;
        let stopwatch = Stopwatch::start_new();

        self.clock.advance(dt);
        let now = self.clock.now();
        self.pipeline.begin_tick();
        let mut report = TickReport {
            tick: self.clock.tick(),
            now,
            ..TickReport::default()
        };

        let seconds = dt / 1000.0;
        for pool in self.pools.values_mut() {
            for (_, entity) in pool.iter_active_mut() {
                entity.motion.integrate(seconds);
                report.integrated += 1;
            }
        }

        report.footprints = self.refresh_footprints()?;

        self.detect_collisions(now);
        report.collisions = self.collisions.len();

        let mut ctx = ResolutionContext::new(now, self.config.sphere_radius, self.collision_orientations());
        report.dispatch = self.dispatcher.dispatch(&self.collisions, &mut ctx);
        let mut commands = ctx.into_commands();

        let expired = self.expired_handles(now);
        report.expired = expired.len();
        commands.extend(expired.into_iter().map(Command::Release));

        let (released, spawned) = self.apply_commands(commands);
        report.released = released;
        report.spawned = spawned;

        for pool in self.pools.values_mut() {
            let drained = pool.flush_disposals();
            report.disposals.disposed += drained.disposed;
            report.disposals.failed += drained.failed;
            report.disposals.skipped += drained.skipped;
        }

        report.elapsed = stopwatch.elapsed();
        log::trace!("Tick {} at {now} ms: {report:?}", report.tick);
        Ok(report)
    }

    fn refresh_footprints(&mut self) -> Result<usize, SpatialError> {
        let radius = self.config.sphere_radius;
        let mut refreshed = 0;
        for kind in EntityKind::ALL {
            let Some(resolution) = self.config.kind(kind).footprint_resolution else { continue };
            let Some(pool) = self.pools.get(&kind) else { continue };
            for (_, entity) in pool.iter_active() {
                self.footprints.footprint_cells(
                    kind,
                    &entity.position(radius),
                    entity.footprint_radius(),
                    resolution,
                )?;
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }

    fn detect_collisions(&mut self, now: Millis) {
        let radius = self.config.sphere_radius;
        let mut targets = Vec::new();
        let mut projectiles = Vec::new();
        for kind in EntityKind::ALL {
            let roles = self.config.kind(kind).roles;
            let Some(pool) = self.pools.get(&kind) else { continue };
            if roles.is_empty() {
                continue;
            }
            for slot in pool.active_ids() {
                let Some(entity) = pool.get(slot) else { continue };
                let collider = Collider::from_entity(entity, radius, now);
                if roles.is_target() {
                    targets.push(collider.clone());
                }
                if roles.is_projectile() {
                    projectiles.push(collider);
                }
            }
        }
        self.collisions = self.pipeline.detect(&targets, &projectiles).to_vec();
        if !self.collisions.is_empty() {
            log::debug!("{} collisions at {now} ms", self.collisions.len());
        }
    }

    fn collision_orientations(&self) -> HashMap<EntityHandle, Quat> {
        self.collisions
            .iter()
            .flat_map(|pair| [pair.target, pair.projectile])
            .filter_map(|handle| Some((handle, *self.entity(handle)?.orientation())))
            .collect()
    }

    fn expired_handles(&self, now: Millis) -> Vec<EntityHandle> {
        let mut expired = Vec::new();
        for kind in EntityKind::ALL {
            let Some(lifetime) = self.config.kind(kind).lifetime_ms else { continue };
            let Some(pool) = self.pools.get(&kind) else { continue };
            for slot in pool.active_ids() {
                if pool.get(slot).is_some_and(|e| e.timestamps.is_expired(lifetime, now)) {
                    expired.push(EntityHandle::new(kind, slot));
                }
            }
        }
        expired
    }

    /// Apply commands in order. A handle is released at most once; releases
    /// of entities that are no longer active are skipped.
    fn apply_commands(&mut self, commands: Vec<Command>) -> (usize, usize) {
        let mut released = HashSet::new();
        let mut spawned = 0;
        for command in commands {
            match command {
                Command::Release(handle) => {
                    if !released.insert(handle) {
                        continue;
                    }
                    if let Err(e) = self.release(handle) {
                        released.remove(&handle);
                        log::debug!("Skipping release of {handle}: {e}");
                    }
                }
                Command::Spawn(request) => match self.spawn(&request) {
                    Ok(handle) => {
                        log::trace!("Spawned {handle}");
                        spawned += 1;
                    }
                    Err(e) => log::warn!("Dropping {} spawn request: {e}", request.kind),
                },
            }
        }
        (released.len(), spawned)
    }

    fn spawn(&mut self, request: &SpawnRequest) -> Result<EntityHandle, SimulationError> {
        let handle = self.acquire(request.kind, None)?;
        let entity = self
            .entity_mut(handle)
            .ok_or_else(|| SimulationError::InvariantViolation(format!("{handle} missing after spawn")))?;
        entity.motion.set_orientation(request.orientation);
        entity.motion.set_heading(request.heading, request.speed);
        entity.owner = request.owner;
        Ok(handle)
    }

    /// Dispose every entity of every pool immediately
    pub fn shutdown(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        for kind in EntityKind::ALL {
            if let Some(pool) = self.pools.get_mut(&kind) {
                let drained = pool.shutdown();
                report.disposed += drained.disposed;
                report.failed += drained.failed;
                report.skipped += drained.skipped;
            }
        }
        self.collisions.clear();
        self.pipeline.clear();
        self.footprints.clear();
        log::info!("Simulation shut down after {} ticks", self.clock.tick());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils::deg_to_rad;
    use crate::kinematics::from_lat_lng;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn place(sim: &mut Simulation, kind: EntityKind, lat: f64, lng: f64) -> EntityHandle {
        let handle = sim.acquire(kind, None).unwrap();
        sim.entity_mut(handle)
            .unwrap()
            .motion
            .set_orientation(from_lat_lng(deg_to_rad(lat), deg_to_rad(lng)));
        handle
    }

    #[test]
    fn test_positions_stay_on_sphere() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let rock = place(&mut sim, EntityKind::Rock, 10.0, 20.0);
        sim.set_heading(rock, 0.7, 0.25).unwrap();

        for _ in 0..50 {
            sim.step(16.0).unwrap();
            assert_relative_eq!(sim.position_of(rock).unwrap().norm(), 5.0, epsilon = 1e-9);
        }
        assert_relative_eq!(sim.now(), 800.0);
        assert_eq!(sim.tick(), 50);
    }

    #[test]
    fn test_colocated_bullet_hits_ship() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let ship = place(&mut sim, EntityKind::Ship, 0.0, 0.0);
        let bullet = place(&mut sim, EntityKind::Bullet, 0.0, 0.0);
        sim.register_handler(EntityKind::Bullet, EntityKind::Ship, |pair: &CollisionPair, ctx: &mut ResolutionContext| {
            ctx.release(pair.target);
            ctx.release(pair.projectile);
        });

        let report = sim.step(0.0).unwrap();
        assert_eq!(sim.collisions_this_tick(), &[CollisionPair::new(ship, bullet)]);
        assert_eq!(report.dispatch.dispatched, 1);
        assert_eq!(report.released, 2);
        assert!(sim.active_handles(EntityKind::Ship).is_empty());
        assert!(sim.entity(bullet).is_none());
    }

    #[test]
    fn test_ships_on_the_same_spot_collide_once() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let first = place(&mut sim, EntityKind::Ship, 11.5, 17.2);
        let second = place(&mut sim, EntityKind::Ship, 11.5, 17.2);

        let report = sim.step(16.0).unwrap();
        assert_eq!(report.collisions, 1);
        assert_eq!(sim.collisions_this_tick(), &[CollisionPair::new(first, second)]);
        let stats = sim.collision_stats();
        assert_eq!((stats.narrow_tests, stats.geometry_failures), (1, 0));
    }

    #[test]
    fn test_distant_bullet_misses() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        place(&mut sim, EntityKind::Ship, 0.0, 0.0);
        place(&mut sim, EntityKind::Bullet, 0.0, 5.0);
        let report = sim.step(0.0).unwrap();
        assert_eq!(report.collisions, 0);
        assert!(sim.collisions_this_tick().is_empty());
    }

    #[test]
    fn test_own_bullet_is_ignored() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let ship = place(&mut sim, EntityKind::Ship, 0.0, 0.0);
        let bullet = place(&mut sim, EntityKind::Bullet, 0.0, 0.0);
        sim.entity_mut(bullet).unwrap().owner = Some(ship);
        sim.step(0.0).unwrap();
        assert!(sim.collisions_this_tick().is_empty());
    }

    #[test]
    fn test_lifetime_expiry_releases_bullets() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let bullet = place(&mut sim, EntityKind::Bullet, 0.0, 0.0);

        assert_eq!(sim.step(1000.0).unwrap().expired, 0);
        let report = sim.step(200.0).unwrap();
        assert_eq!(report.expired, 1);
        assert!(sim.entity(bullet).is_none());

        let stats = sim.pool_stats(EntityKind::Bullet).unwrap();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.idle, 1);

        // Released slot is reused by key
        let again = sim.acquire(EntityKind::Bullet, Some(bullet.slot())).unwrap();
        assert_eq!(again, bullet);
        assert_eq!(sim.entity(again).unwrap().timestamps.created_at, 1200.0);
    }

    #[test]
    fn test_handler_spawns_apply_after_dispatch() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let rock = place(&mut sim, EntityKind::Rock, 0.0, 0.0);
        let bullet = place(&mut sim, EntityKind::Bullet, 0.0, 0.0);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        sim.register_handler(EntityKind::Bullet, EntityKind::Rock, move |pair: &CollisionPair, ctx: &mut ResolutionContext| {
            log.borrow_mut().push(*pair);
            let at = ctx.orientation_of(pair.target).unwrap_or_else(Quat::identity);
            ctx.release(pair.target);
            ctx.release(pair.projectile);
            ctx.spawn(SpawnRequest::at(EntityKind::Explosion, at));
            ctx.spawn(SpawnRequest::at(EntityKind::Rock, at).moving(1.0, 0.2).owned_by(pair.projectile));
        });

        let report = sim.step(0.0).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(report.spawned, 2);
        assert_eq!(sim.active_handles(EntityKind::Explosion).len(), 1);

        // The fragment reuses the rock's slot from the idle store
        let fragments = sim.active_handles(EntityKind::Rock);
        assert_eq!(fragments, vec![rock]);
        let fragment = sim.entity(rock).unwrap();
        assert_eq!(fragment.owner, Some(bullet));
        assert_relative_eq!(fragment.motion.speed(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_invulnerable_ship_ignores_rocks() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        place(&mut sim, EntityKind::Ship, 0.0, 0.0);
        place(&mut sim, EntityKind::Rock, 0.0, 0.0);

        sim.step(100.0).unwrap();
        assert!(sim.collisions_this_tick().is_empty());

        sim.step(3000.0).unwrap();
        assert_eq!(sim.collisions_this_tick().len(), 1);
    }

    #[test]
    fn test_disabled_kind_is_configuration_error() {
        let config = SimulationConfig::default().with_kind(EntityKind::CellMarker, KindConfig::disabled());
        let mut sim = Simulation::new(config).unwrap();
        assert!(matches!(
            sim.acquire(EntityKind::CellMarker, None),
            Err(SimulationError::ConfigurationError(_))
        ));
        assert!(sim.pool_stats(EntityKind::CellMarker).is_err());
        assert!(sim.active_handles(EntityKind::CellMarker).is_empty());
    }

    #[test]
    fn test_invalid_state_aborts_tick_before_mutation() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let rock = place(&mut sim, EntityKind::Rock, 0.0, 0.0);
        sim.entity_mut(rock).unwrap().outline = None;

        assert!(matches!(sim.step(16.0), Err(SimulationError::InvariantViolation(_))));
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.now(), 0.0);

        assert!(matches!(sim.step(f64::NAN), Err(SimulationError::InvariantViolation(_))));
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let rock = place(&mut sim, EntityKind::Rock, 0.0, 0.0);
        sim.release(rock).unwrap();
        assert!(matches!(sim.release(rock), Err(SimulationError::Pool(_))));
        assert!(matches!(sim.position_of(rock), Err(SimulationError::InvariantViolation(_))));
    }

    #[test]
    fn test_footprint_cells_through_simulation() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let ship = place(&mut sim, EntityKind::Ship, 30.0, 60.0);
        let report = sim.step(16.0).unwrap();
        assert_eq!(report.footprints, 1);

        let cells = sim.footprint_cells(ship, 3).unwrap();
        assert!(!cells.is_empty());
        assert!(cells.iter().all(|c| c.resolution() == 3));
        assert_eq!(sim.footprint_stats().memo_hits, 1);
    }

    #[test]
    fn test_shutdown_disposes_everything() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        place(&mut sim, EntityKind::Rock, 0.0, 0.0);
        let bullet = place(&mut sim, EntityKind::Bullet, 40.0, 0.0);
        sim.release(bullet).unwrap();

        let report = sim.shutdown();
        assert_eq!(report.disposed, 2);
        assert_eq!(sim.pool_stats(EntityKind::Rock).unwrap().active, 0);
    }
}
