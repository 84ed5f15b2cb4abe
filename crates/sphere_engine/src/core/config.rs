//! # Simulation Configuration
//!
//! All tunables of the simulation core live here: the sphere radius, one
//! [`KindConfig`] per entity kind, and the capacities of the footprint index
//! caches.
//!
//! ## Design Goals
//!
//! - **Serializable**: Loaded from TOML or RON through the [`Config`] trait
//! - **Type Safe**: Every kind has a named section; there are no string keys
//! - **Validated**: [`SimulationConfig::validate`] rejects nonsensical values
//!   before a simulation is built

use crate::ecs::EntityKind;
use crate::physics::Roles;
use crate::spatial::MAX_RESOLUTION;
use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// # Kind Configuration
///
/// Behavior shared by every entity of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindConfig {
    /// Whether the simulation builds a pool for this kind
    pub enabled: bool,
    /// Angular speed limit in radians per second
    pub max_speed: f64,
    /// Radius of the circular footprint in world units
    pub footprint_radius: f64,
    /// Idle items kept for reuse before eviction
    pub pool_max_size: usize,
    /// Released automatically this long after acquisition
    pub lifetime_ms: Option<f64>,
    /// Ignores rocks this long after acquisition
    pub invulnerability_ms: Option<f64>,
    /// Collision roles
    pub roles: Roles,
    /// Resolution at which footprints are indexed every tick
    pub footprint_resolution: Option<u8>,
}

impl Default for KindConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_speed: 1.0,
            footprint_radius: 0.1,
            pool_max_size: 32,
            lifetime_ms: None,
            invulnerability_ms: None,
            roles: Roles::empty(),
            footprint_resolution: None,
        }
    }
}

impl KindConfig {
    /// Settings for a kind the simulation does not use
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the speed limit
    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Set the footprint radius
    pub fn with_footprint_radius(mut self, radius: f64) -> Self {
        self.footprint_radius = radius;
        self
    }

    /// Set the idle pool capacity
    pub fn with_pool_max_size(mut self, size: usize) -> Self {
        self.pool_max_size = size;
        self
    }

    /// Set the automatic release delay
    pub fn with_lifetime_ms(mut self, lifetime: f64) -> Self {
        self.lifetime_ms = Some(lifetime);
        self
    }

    /// Set the post-spawn invulnerability window
    pub fn with_invulnerability_ms(mut self, window: f64) -> Self {
        self.invulnerability_ms = Some(window);
        self
    }

    /// Set the collision roles
    pub fn with_roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    /// Index footprints at `resolution` every tick
    pub fn with_footprint_resolution(mut self, resolution: u8) -> Self {
        self.footprint_resolution = Some(resolution);
        self
    }

    fn validate(&self, kind: EntityKind) -> Result<(), ConfigError> {
        let invalid = |what: &str| Err(ConfigError::Invalid(format!("{kind}: {what}")));
        if !(self.max_speed.is_finite() && self.max_speed >= 0.0) {
            return invalid("max_speed must be finite and non-negative");
        }
        if !(self.footprint_radius.is_finite() && self.footprint_radius > 0.0) {
            return invalid("footprint_radius must be finite and positive");
        }
        if self.lifetime_ms.is_some_and(|l| !(l.is_finite() && l > 0.0)) {
            return invalid("lifetime_ms must be finite and positive");
        }
        if self.invulnerability_ms.is_some_and(|w| !(w.is_finite() && w >= 0.0)) {
            return invalid("invulnerability_ms must be finite and non-negative");
        }
        if self.footprint_resolution.is_some_and(|r| r > MAX_RESOLUTION) {
            return invalid("footprint_resolution is above the finest grid resolution");
        }
        Ok(())
    }
}

/// One [`KindConfig`] per entity kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindTable {
    /// Ships
    pub ship: KindConfig,
    /// Rocks
    pub rock: KindConfig,
    /// Bullets
    pub bullet: KindConfig,
    /// Explosions
    pub explosion: KindConfig,
    /// Cell markers
    pub cell_marker: KindConfig,
}

impl Default for KindTable {
    fn default() -> Self {
        Self {
            ship: KindConfig::default()
                .with_max_speed(0.6)
                .with_footprint_radius(0.11)
                .with_pool_max_size(8)
                .with_invulnerability_ms(3000.0)
                .with_roles(Roles::default_for(EntityKind::Ship))
                .with_footprint_resolution(3),
            rock: KindConfig::default()
                .with_max_speed(0.3)
                .with_footprint_radius(0.25)
                .with_pool_max_size(64)
                .with_roles(Roles::default_for(EntityKind::Rock)),
            bullet: KindConfig::default()
                .with_max_speed(2.0)
                .with_footprint_radius(0.009)
                .with_pool_max_size(128)
                .with_lifetime_ms(1200.0)
                .with_roles(Roles::default_for(EntityKind::Bullet)),
            explosion: KindConfig::default()
                .with_max_speed(0.0)
                .with_footprint_radius(0.3)
                .with_pool_max_size(32)
                .with_lifetime_ms(500.0)
                .with_roles(Roles::default_for(EntityKind::Explosion)),
            cell_marker: KindConfig::default()
                .with_max_speed(0.0)
                .with_footprint_radius(0.05)
                .with_pool_max_size(256)
                .with_lifetime_ms(10_000.0)
                .with_roles(Roles::default_for(EntityKind::CellMarker)),
        }
    }
}

impl KindTable {
    /// Configuration of `kind`
    pub fn get(&self, kind: EntityKind) -> &KindConfig {
        match kind {
            EntityKind::Ship => &self.ship,
            EntityKind::Rock => &self.rock,
            EntityKind::Bullet => &self.bullet,
            EntityKind::Explosion => &self.explosion,
            EntityKind::CellMarker => &self.cell_marker,
        }
    }

    /// Mutable configuration of `kind`
    pub fn get_mut(&mut self, kind: EntityKind) -> &mut KindConfig {
        match kind {
            EntityKind::Ship => &mut self.ship,
            EntityKind::Rock => &mut self.rock,
            EntityKind::Bullet => &mut self.bullet,
            EntityKind::Explosion => &mut self.explosion,
            EntityKind::CellMarker => &mut self.cell_marker,
        }
    }
}

/// # Footprint Index Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootprintConfig {
    /// Resolution of the cell that keys memoized footprints
    pub coarse_resolution: u8,
    /// Memoized footprints kept
    pub memo_capacity: usize,
    /// k-ring neighborhoods kept
    pub ring_cache_capacity: usize,
    /// Cell bounding spheres kept
    pub sphere_cache_capacity: usize,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            coarse_resolution: 1,
            memo_capacity: 1024,
            ring_cache_capacity: 512,
            sphere_cache_capacity: 2048,
        }
    }
}

/// # Simulation Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Radius of the playing sphere in world units
    pub sphere_radius: f64,
    /// Per-kind settings
    pub kinds: KindTable,
    /// Footprint index settings
    pub footprint: FootprintConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sphere_radius: 5.0,
            kinds: KindTable::default(),
            footprint: FootprintConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Set the sphere radius
    pub fn with_sphere_radius(mut self, radius: f64) -> Self {
        self.sphere_radius = radius;
        self
    }

    /// Replace the settings of one kind
    pub fn with_kind(mut self, kind: EntityKind, config: KindConfig) -> Self {
        *self.kinds.get_mut(kind) = config;
        self
    }

    /// Replace the footprint index settings
    pub fn with_footprint(mut self, footprint: FootprintConfig) -> Self {
        self.footprint = footprint;
        self
    }

    /// Settings of `kind`
    pub fn kind(&self, kind: EntityKind) -> &KindConfig {
        self.kinds.get(kind)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sphere_radius.is_finite() && self.sphere_radius > 0.0) {
            return Err(ConfigError::Invalid(
                "sphere_radius must be finite and positive".to_string(),
            ));
        }
        if self.footprint.coarse_resolution > MAX_RESOLUTION {
            return Err(ConfigError::Invalid(format!(
                "footprint.coarse_resolution {} is above {MAX_RESOLUTION}",
                self.footprint.coarse_resolution
            )));
        }
        for kind in EntityKind::ALL {
            self.kinds.get(kind).validate(kind)?;
        }
        Ok(())
    }
}

impl Config for SimulationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        SimulationConfig::validate(self)
    }
}
