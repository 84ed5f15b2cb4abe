//! Time management utilities

use std::time::{Duration, Instant};

/// Simulation time in milliseconds since the simulation started
pub type Millis = f64;

/// Simulation clock advanced explicitly by `step(dt)`.
///
/// Lifetime and invulnerability checks compare against this clock rather than
/// the host's wall clock, so a paused host pauses every timer with it.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Millis,
    tick: u64,
}

impl SimClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` milliseconds and bump the tick counter
    pub fn advance(&mut self, dt: Millis) {
        self.now += dt.max(0.0);
        self.tick += 1;
    }

    /// Current simulation time
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Number of completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Milliseconds elapsed since `since`
    pub fn elapsed_since(&self, since: Millis) -> Millis {
        self.now - since
    }
}

/// Simple stopwatch for measuring elapsed wall time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed += start.elapsed();
            self.start_time = None;
        }
    }

    /// Total elapsed time, including the running segment
    pub fn elapsed(&self) -> Duration {
        match self.start_time {
            Some(start) => self.elapsed + start.elapsed(),
            None => self.elapsed,
        }
    }
}
