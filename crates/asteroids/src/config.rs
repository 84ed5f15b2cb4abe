//! Game configuration

use serde::{Deserialize, Serialize};
use sphere_engine::core::config::{Config, ConfigError, SimulationConfig};

/// Game configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Gameplay settings
    pub gameplay: GameplayConfig,

    /// Simulation core settings
    pub simulation: SimulationConfig,
}

/// Gameplay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Starting lives
    pub starting_lives: u32,

    /// Rocks placed at the start
    pub asteroid_count: u32,

    /// Rock speed range (rad/s)
    pub asteroid_speed: (f64, f64),

    /// Bullet speed (rad/s)
    pub bullet_speed: f64,

    /// Time between shots (ms)
    pub fire_interval_ms: f64,

    /// Ship turn per tick while cruising (radians)
    pub ship_turn_per_tick: f64,

    /// Ship cruising speed (rad/s)
    pub ship_speed: f64,

    /// Delay between losing a ship and the next one appearing (ms)
    pub respawn_delay_ms: f64,

    /// Points per destroyed rock
    pub rock_score: u32,

    /// Physics time step (ms)
    pub tick_ms: f64,

    /// Ticks to run before stopping
    pub max_ticks: u64,

    /// Random seed for rock placement
    pub seed: u64,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            starting_lives: 3,
            asteroid_count: 12,
            asteroid_speed: (0.05, 0.25),
            bullet_speed: 2.0,
            fire_interval_ms: 250.0,
            ship_turn_per_tick: 0.02,
            ship_speed: 0.3,
            respawn_delay_ms: 2000.0,
            rock_score: 100,
            tick_ms: 1000.0 / 60.0,
            max_ticks: 60 * 60,
            seed: 7,
        }
    }
}

impl Config for GameConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let gameplay = &self.gameplay;
        if !(gameplay.tick_ms.is_finite() && gameplay.tick_ms > 0.0) {
            return Err(ConfigError::Invalid("gameplay.tick_ms must be positive".to_string()));
        }
        if gameplay.asteroid_speed.0 > gameplay.asteroid_speed.1 {
            return Err(ConfigError::Invalid(
                "gameplay.asteroid_speed must be (min, max)".to_string(),
            ));
        }
        self.simulation.validate()
    }
}

impl GameConfig {
    /// Load configuration from `path`, or return the default if there is none
    pub fn load_or_default(path: Option<&str>) -> Self {
        let Some(path) = path else {
            log::info!("No configuration file given, using defaults");
            return Self::default();
        };
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load {path}: {e}; using defaults");
                Self::default()
            }
        }
    }
}
