//! # Core Module
//!
//! Shared configuration for the simulation core. Every subsystem reads its
//! tunables from [`SimulationConfig`].
//!
//! ## Organization
//!
//! - **Config**: Simulation, per-kind and footprint index settings

pub mod config;

// Re-export commonly used config types
pub use config::{
    Config,
    ConfigError,
    ConfigFormat,
    FootprintConfig,
    KindConfig,
    KindTable,
    SimulationConfig,
};
