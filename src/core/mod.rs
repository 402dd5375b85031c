//! Core primitives.
//!
//! Seeded randomness and the small amount of geometry the simulation needs.
//! Collision in this game is radius or box overlap only.

pub mod geometry;
pub mod rng;

// Re-export core types
pub use geometry::{aabb_overlap, circles_overlap, direction_to, Rect, EPSILON};
pub use rng::DeterministicRng;
