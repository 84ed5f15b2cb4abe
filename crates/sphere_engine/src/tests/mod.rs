//! Crate-level scenario tests
//!
//! Whole-simulation workflows that cross module boundaries.

mod arena_scenario;
