//! Logging utilities and structured logging support
//!
//! The library only talks to the `log` facade. Binaries pick the backend by
//! calling [`init`] once at startup.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system (`RUST_LOG` controls the filter)
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default filter when `RUST_LOG` is unset
pub fn init_with_default(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
