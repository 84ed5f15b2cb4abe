//! Object pooling
//!
//! Reusable storage for short-lived simulation objects. Each item is in
//! exactly one of three states at any time: checked out ([`PoolState::Active`]),
//! parked for reuse ([`PoolState::Idle`]) or waiting for its disposer
//! ([`PoolState::Disposing`]).

pub mod disposal;
pub mod object_pool;

pub use disposal::{DisposalQueue, DisposeError, DisposeResult, DrainReport};
pub use object_pool::{ObjectPool, PoolBuilder};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable identifier of a pooled item, unique within its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(u64);

impl SlotId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a pooled item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolState {
    /// Checked out by a caller
    Active,
    /// Reset and parked for reuse
    Idle,
    /// Evicted, waiting for the disposer
    Disposing,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Active => "active",
            PoolState::Idle => "idle",
            PoolState::Disposing => "disposing",
        };
        f.write_str(name)
    }
}

/// Items that mirror their pool state
pub trait PoolItem {
    /// Called by the pool on every state transition
    fn set_pool_state(&mut self, state: PoolState);
}

/// Pool errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    /// A pool was built without a factory
    #[error("Pool '{0}' has no factory")]
    NotInitialized(String),

    /// Release of an id that is not checked out
    #[error("Pool '{pool}': {id} is not active (state: {state:?})")]
    NotActive {
        /// Pool name
        pool: String,
        /// Id that was released
        id: SlotId,
        /// Its current state, `None` once disposed
        state: Option<PoolState>,
    },
}

/// Counters and gauges of one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Items parked for reuse
    pub idle: usize,
    /// Items checked out
    pub active: usize,
    /// Items waiting for disposal
    pub disposing: usize,
    /// Successful `acquire` calls
    pub acquisitions: u64,
    /// Items returned to the idle store
    pub releases: u64,
    /// Items whose disposer succeeded
    pub disposals: u64,
    /// Acquisitions served from the idle store
    pub hits: u64,
    /// Acquisitions served by the factory
    pub misses: u64,
    /// Idle items pushed out by the capacity limit
    pub evictions: u64,
    /// Disposers that returned an error
    pub disposal_failures: u64,
}
