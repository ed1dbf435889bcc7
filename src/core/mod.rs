//! Core primitives.
//!
//! Grid coordinates and the seeded random source used by maze generation.

pub mod grid;
pub mod rng;

// Re-export core types
pub use grid::{Direction, Position};
pub use rng::DeterministicRng;
