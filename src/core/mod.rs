//! Core deterministic primitives.
//!
//! Grid geometry, the seeded RNG and state hashing. Nothing in here reads
//! the clock or touches the network.

pub mod grid;
pub mod hash;
pub mod rng;

// Re-export core types
pub use grid::{GridBounds, Position};
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use rng::DeterministicRng;
