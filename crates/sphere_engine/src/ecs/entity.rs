//! Entity implementation
//!
//! Every simulated object is an [`Entity`] owned by the pool of its kind. The
//! kind is an explicit discriminant; nothing is inferred from which optional
//! fields happen to be set.

use crate::foundation::math::{Quat, Vec3};
use crate::foundation::time::Millis;
use crate::kinematics::SphericalMotion;
use crate::physics::collision::Outline;
use crate::pool::{PoolItem, PoolState, SlotId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a simulated entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Player or AI ship
    Ship,
    /// Drifting rock
    Rock,
    /// Short-lived projectile fired by a ship
    Bullet,
    /// Blast area left by a destroyed entity
    Explosion,
    /// Terrain marker
    CellMarker,
}

impl EntityKind {
    /// Every kind, in declaration order
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Ship,
        EntityKind::Rock,
        EntityKind::Bullet,
        EntityKind::Explosion,
        EntityKind::CellMarker,
    ];

    /// Kinds whose broad-phase overlap is final and never reaches the narrow
    /// phase
    pub fn is_projectile_class(self) -> bool {
        matches!(self, EntityKind::Bullet | EntityKind::Explosion)
    }

    /// Lower-case name used in logs and pool names
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Ship => "ship",
            EntityKind::Rock => "rock",
            EntityKind::Bullet => "bullet",
            EntityKind::Explosion => "explosion",
            EntityKind::CellMarker => "cell_marker",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Entity identifier: kind plus the slot in that kind's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle {
    kind: EntityKind,
    slot: SlotId,
}

impl EntityHandle {
    /// Create a handle
    pub const fn new(kind: EntityKind, slot: SlotId) -> Self {
        Self { kind, slot }
    }

    /// Kind of the entity
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Pool slot of the entity
    pub fn slot(&self) -> SlotId {
        self.slot
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.slot)
    }
}

/// Simulation-clock timestamps of an entity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timestamps {
    /// When the entity was last acquired
    pub created_at: Millis,
    /// When the entity was fired, for projectiles
    pub fired_at: Option<Millis>,
    /// End of the post-spawn invulnerability window
    pub invulnerable_until: Option<Millis>,
}

impl Timestamps {
    /// Timestamps for an entity acquired at `now`
    pub fn spawned_at(now: Millis) -> Self {
        Self {
            created_at: now,
            ..Self::default()
        }
    }

    /// Whether `now` falls inside the invulnerability window
    pub fn is_invulnerable(&self, now: Millis) -> bool {
        self.invulnerable_until.is_some_and(|until| now < until)
    }

    /// Whether an entity with `lifetime` has outlived it at `now`
    pub fn is_expired(&self, lifetime: Millis, now: Millis) -> bool {
        lifetime > 0.0 && now - self.created_at >= lifetime
    }
}

/// A simulated entity.
///
/// The position is never stored: it is the reference pole rotated by the
/// motion's orientation and scaled by the sphere radius.
#[derive(Debug, Clone)]
pub struct Entity {
    handle: EntityHandle,
    /// Orientation and angular velocity
    pub motion: SphericalMotion,
    footprint_radius: f64,
    /// Spawn, fire and invulnerability times
    pub timestamps: Timestamps,
    pool_state: PoolState,
    /// Entity that spawned this one (a bullet's ship)
    pub owner: Option<EntityHandle>,
    /// Narrow-phase outline, if the kind has one
    pub outline: Option<Outline>,
}

impl Entity {
    /// Create an entity at the pole, at rest
    pub fn new(handle: EntityHandle, max_speed: f64, footprint_radius: f64) -> Self {
        Self {
            handle,
            motion: SphericalMotion::new(max_speed),
            footprint_radius,
            timestamps: Timestamps::default(),
            pool_state: PoolState::Active,
            owner: None,
            outline: None,
        }
    }

    /// Attach a narrow-phase outline
    pub fn with_outline(mut self, outline: Outline) -> Self {
        self.outline = Some(outline);
        self
    }

    /// Handle of this entity
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Kind of this entity
    pub fn kind(&self) -> EntityKind {
        self.handle.kind
    }

    /// Radius of the circular footprint in world units
    pub fn footprint_radius(&self) -> f64 {
        self.footprint_radius
    }

    /// Lifecycle state mirrored from the pool
    pub fn pool_state(&self) -> PoolState {
        self.pool_state
    }

    /// Current orientation
    pub fn orientation(&self) -> &Quat {
        self.motion.orientation()
    }

    /// Position on a sphere of `radius`
    pub fn position(&self, radius: f64) -> Vec3 {
        self.motion.position(radius)
    }

    /// Clear per-use state before the entity goes back to the pool.
    ///
    /// The outline and speed limit belong to the kind and survive.
    pub fn reset(mut self) -> Self {
        self.motion.reset();
        self.timestamps = Timestamps::default();
        self.owner = None;
        self
    }
}

impl PoolItem for Entity {
    fn set_pool_state(&mut self, state: PoolState) {
        self.pool_state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::UP;
    use approx::assert_relative_eq;

    #[test]
    fn test_projectile_class() {
        assert!(EntityKind::Bullet.is_projectile_class());
        assert!(EntityKind::Explosion.is_projectile_class());
        assert!(!EntityKind::Ship.is_projectile_class());
        assert!(!EntityKind::Rock.is_projectile_class());
        assert!(!EntityKind::CellMarker.is_projectile_class());
    }

    #[test]
    fn test_position_stays_on_sphere() {
        let handle = EntityHandle::new(EntityKind::Rock, SlotId::new(3));
        let mut rock = Entity::new(handle, 1.0, 0.2);
        rock.motion.look_at(&Vec3::new(1.0, 2.0, -3.0));
        rock.motion.set_heading(0.4, 0.8);
        for _ in 0..100 {
            rock.motion.integrate(0.016);
            assert_relative_eq!(rock.position(5.0).norm(), 5.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reset_clears_per_use_state() {
        let handle = EntityHandle::new(EntityKind::Bullet, SlotId::new(0));
        let owner = EntityHandle::new(EntityKind::Ship, SlotId::new(1));
        let mut bullet = Entity::new(handle, 4.0, 0.01).with_outline(Outline::ship(0.01));
        bullet.owner = Some(owner);
        bullet.timestamps = Timestamps {
            created_at: 10.0,
            fired_at: Some(10.0),
            invulnerable_until: None,
        };
        bullet.motion.set_heading(0.0, 3.0);

        let bullet = bullet.reset();
        assert_eq!(bullet.owner, None);
        assert_eq!(bullet.timestamps, Timestamps::default());
        assert_eq!(bullet.motion.direction(), UP);
        assert!(bullet.outline.is_some());
        assert_eq!(bullet.motion.max_speed(), 4.0);
    }

    #[test]
    fn test_timestamps() {
        let mut stamps = Timestamps::spawned_at(100.0);
        assert!(!stamps.is_invulnerable(150.0));
        stamps.invulnerable_until = Some(200.0);
        assert!(stamps.is_invulnerable(150.0));
        assert!(!stamps.is_invulnerable(200.0));

        assert!(!stamps.is_expired(500.0, 599.0));
        assert!(stamps.is_expired(500.0, 600.0));
        assert!(!stamps.is_expired(0.0, 1e9));
    }
}
