//! Core collision detection system
//!
//! Detection is split into two phases:
//! - **Broad phase**: bounding-sphere overlap between every target and every
//!   projectile, with greedy one-to-one assignment of projectiles
//! - **Narrow phase**: outline intersection for pairs where neither side is a
//!   projectile-class entity
//!
//! The pipeline works on borrowed [`Collider`] views built fresh each tick and
//! does not depend on the pools or on the footprint index.

use crate::ecs::{Entity, EntityHandle, EntityKind};
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::time::Millis;
use crate::physics::collision::{
    polygons_intersect, project_pair, BoundingSphere, GeometryError, Outline, OutlineCache,
};
use std::collections::HashSet;

/// A confirmed hit of `projectile` on `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// Entity that was hit
    pub target: EntityHandle,
    /// Entity that hit it
    pub projectile: EntityHandle,
}

impl CollisionPair {
    /// Create a new collision pair
    pub fn new(target: EntityHandle, projectile: EntityHandle) -> Self {
        Self { target, projectile }
    }

    /// The same two entities with roles swapped
    pub fn mirrored(&self) -> Self {
        Self {
            target: self.projectile,
            projectile: self.target,
        }
    }

    /// `(projectile kind, target kind)`, the key used for dispatch
    pub fn kinds(&self) -> (EntityKind, EntityKind) {
        (self.projectile.kind(), self.target.kind())
    }
}

/// Per-tick view of one entity as the collision pipeline sees it
#[derive(Debug, Clone)]
pub struct Collider<'a> {
    /// Entity handle
    pub handle: EntityHandle,
    /// World-space position
    pub position: Vec3,
    /// Broad-phase radius
    pub radius: f64,
    /// Orientation used to lift the outline
    pub orientation: Quat,
    /// Narrow-phase outline
    pub outline: Option<&'a Outline>,
    /// Spawner, for own-projectile exclusion
    pub owner: Option<EntityHandle>,
    /// Inside the post-spawn invulnerability window this tick
    pub invulnerable: bool,
}

impl<'a> Collider<'a> {
    /// Build a collider view of `entity` at simulation time `now`
    pub fn from_entity(entity: &'a Entity, sphere_radius: f64, now: Millis) -> Self {
        Self {
            handle: entity.handle(),
            position: entity.position(sphere_radius),
            radius: entity.footprint_radius(),
            orientation: *entity.orientation(),
            outline: entity.outline.as_ref(),
            owner: entity.owner,
            invulnerable: entity.timestamps.is_invulnerable(now),
        }
    }

    /// Kind of the underlying entity
    pub fn kind(&self) -> EntityKind {
        self.handle.kind()
    }

    /// Broad-phase bounding sphere
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.position, self.radius)
    }

    /// Whether pairs with this collider go through the narrow phase
    pub fn needs_narrow_phase(&self) -> bool {
        !self.kind().is_projectile_class()
    }
}

/// Counters for the most recent [`CollisionPipeline::detect`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionStats {
    /// Sphere tests performed
    pub broad_tests: u64,
    /// Sphere tests that overlapped
    pub broad_hits: u64,
    /// Pairs skipped by an exclusion rule
    pub excluded: u64,
    /// Outline tests performed
    pub narrow_tests: u64,
    /// Outline tests that found no overlap
    pub narrow_rejections: u64,
    /// Outline tests that failed on degenerate geometry
    pub geometry_failures: u64,
    /// Confirmed pairs
    pub pairs: u64,
}

/// Two-phase collision detection
pub struct CollisionPipeline {
    sphere_radius: f64,
    outlines: OutlineCache,
    current_pairs: Vec<CollisionPair>,
    previous_pairs: HashSet<CollisionPair>,
    stats: CollisionStats,
}

impl CollisionPipeline {
    /// Create a pipeline for a sphere of `sphere_radius`
    pub fn new(sphere_radius: f64) -> Self {
        Self {
            sphere_radius,
            outlines: OutlineCache::new(),
            current_pairs: Vec::new(),
            previous_pairs: HashSet::new(),
            stats: CollisionStats::default(),
        }
    }

    /// Start a new tick. Drops every outline lifted during the last one.
    pub fn begin_tick(&mut self) {
        self.outlines.begin_tick();
        self.stats = CollisionStats::default();
    }

    /// Match projectiles to targets.
    ///
    /// Targets are visited in the given order and, for each, projectiles in
    /// the given order. A projectile that confirms a hit is used up for the
    /// rest of the pass. Exclusions are checked before any geometry and never
    /// use up a projectile.
    pub fn detect(&mut self, targets: &[Collider<'_>], projectiles: &[Collider<'_>]) -> &[CollisionPair] {
        self.previous_pairs = self.current_pairs.drain(..).collect();
        let mut used = vec![false; projectiles.len()];
        // Unordered couples already put through the geometry tests
        let mut tested: HashSet<(EntityHandle, EntityHandle)> = HashSet::new();

        for target in targets {
            for (index, projectile) in projectiles.iter().enumerate() {
                if used[index] {
                    continue;
                }
                if Self::is_excluded(target, projectile) {
                    self.stats.excluded += 1;
                    continue;
                }
                // Ships are both targets and projectiles; test each couple once
                let pair = CollisionPair::new(target.handle, projectile.handle);
                if !tested.insert(Self::couple(&pair)) {
                    continue;
                }

                self.stats.broad_tests += 1;
                if !target.bounding_sphere().intersects(&projectile.bounding_sphere()) {
                    continue;
                }
                self.stats.broad_hits += 1;

                if target.needs_narrow_phase() && projectile.needs_narrow_phase() && !self.narrow_phase(target, projectile) {
                    continue;
                }

                used[index] = true;
                self.current_pairs.push(pair);
            }
        }

        self.stats.pairs = self.current_pairs.len() as u64;
        log::trace!(
            "Collision pass: {} targets, {} projectiles, {} pairs",
            targets.len(),
            projectiles.len(),
            self.current_pairs.len()
        );
        &self.current_pairs
    }

    fn couple(pair: &CollisionPair) -> (EntityHandle, EntityHandle) {
        if pair.target <= pair.projectile {
            (pair.target, pair.projectile)
        } else {
            (pair.projectile, pair.target)
        }
    }

    /// Pair-level exclusion rules
    fn is_excluded(target: &Collider<'_>, projectile: &Collider<'_>) -> bool {
        if target.handle == projectile.handle {
            return true;
        }
        // A ship's own bullets pass through it
        if projectile.owner == Some(target.handle) || target.owner == Some(projectile.handle) {
            return true;
        }
        // Freshly spawned ships ignore rocks
        let invulnerable_ship_vs_rock = |ship: &Collider<'_>, other: &Collider<'_>| {
            ship.kind() == EntityKind::Ship && ship.invulnerable && other.kind() == EntityKind::Rock
        };
        invulnerable_ship_vs_rock(target, projectile) || invulnerable_ship_vs_rock(projectile, target)
    }

    fn narrow_phase(&mut self, target: &Collider<'_>, projectile: &Collider<'_>) -> bool {
        let (Some(target_outline), Some(projectile_outline)) = (target.outline, projectile.outline) else {
            // Without outlines the sphere test is all we have
            log::trace!("No outline for {} or {}; broad phase decides", target.handle, projectile.handle);
            return true;
        };

        self.stats.narrow_tests += 1;
        match self.outlines_intersect(target, target_outline, projectile, projectile_outline) {
            Ok(true) => true,
            Ok(false) => {
                self.stats.narrow_rejections += 1;
                false
            }
            Err(err) => {
                self.stats.geometry_failures += 1;
                log::warn!(
                    "Narrow phase failed for {} vs {}: {err}; treating as no collision",
                    target.handle,
                    projectile.handle
                );
                false
            }
        }
    }

    fn outlines_intersect(
        &mut self,
        target: &Collider<'_>,
        target_outline: &Outline,
        projectile: &Collider<'_>,
        projectile_outline: &Outline,
    ) -> Result<bool, GeometryError> {
        self.outlines
            .get_or_lift(target.handle, target_outline, &target.orientation, self.sphere_radius);
        self.outlines
            .get_or_lift(projectile.handle, projectile_outline, &projectile.orientation, self.sphere_radius);

        let a = self
            .outlines
            .get(target.handle, target_outline.tag())
            .ok_or(GeometryError::Degenerate("outline missing from cache"))?;
        let b = self
            .outlines
            .get(projectile.handle, projectile_outline.tag())
            .ok_or(GeometryError::Degenerate("outline missing from cache"))?;

        let (polygon_a, polygon_b) = project_pair(a, b)?;
        polygons_intersect(&polygon_a, &polygon_b)
    }

    /// Pairs confirmed by the last pass, in detection order
    pub fn current_pairs(&self) -> &[CollisionPair] {
        &self.current_pairs
    }

    /// Pairs confirmed this pass that were not confirmed in the previous one
    pub fn collision_entered(&self) -> Vec<CollisionPair> {
        self.current_pairs
            .iter()
            .filter(|pair| !self.previous_pairs.contains(pair))
            .copied()
            .collect()
    }

    /// Pairs confirmed in the previous pass that are gone now
    pub fn collision_exited(&self) -> Vec<CollisionPair> {
        let current: HashSet<_> = self.current_pairs.iter().copied().collect();
        let mut exited: Vec<_> = self.previous_pairs.difference(&current).copied().collect();
        exited.sort_unstable();
        exited
    }

    /// Counters of the last pass
    pub fn stats(&self) -> CollisionStats {
        self.stats
    }

    /// Outline cache, for inspection
    pub fn outline_cache(&self) -> &OutlineCache {
        &self.outlines
    }

    /// Sphere radius the pipeline lifts outlines onto
    pub fn sphere_radius(&self) -> f64 {
        self.sphere_radius
    }

    /// Clear all collision data
    pub fn clear(&mut self) {
        self.outlines.begin_tick();
        self.current_pairs.clear();
        self.previous_pairs.clear();
        self.stats = CollisionStats::default();
    }
}
