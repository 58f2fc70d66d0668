//! # Snake Sync Server
//!
//! Authoritative server for a shared multiplayer Snake game. Clients report
//! their frame counter with every input; the server replays exactly the
//! steps it owes and broadcasts snapshots on resets and food events.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SNAKE SYNC SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── grid.rs     - Cell positions and playfield bounds       │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── direction.rs- Headings and the 180° guard               │
//! │  ├── state.rs    - Game state, frame clock, config           │
//! │  ├── collision.rs- Wall and self collision                   │
//! │  ├── food.rs     - Food placement policies                   │
//! │  └── step.rs     - Simulation engine                         │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── protocol.rs - Wire messages                             │
//! │  ├── broadcast.rs- Client registry and fan-out               │
//! │  ├── sync.rs     - Frame-count catch-up controller           │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - Integer cell coordinates only
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same seed and the same ordered inputs, two engines produce
//! identical states and identical state hashes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::grid::{GridBounds, Position};
pub use core::rng::DeterministicRng;
pub use game::{Direction, GameConfig, GameState, Simulation, StepOutcome};
pub use network::{GameServer, ServerConfig, StateSnapshot, SyncController};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Playfield width in pixels
pub const GAME_WIDTH: i32 = 800;

/// Playfield height in pixels
pub const GAME_HEIGHT: i32 = 600;

/// Cell size in pixels; also the snake's step length
pub const SNAKE_SIZE: i32 = 10;

/// Segments in a fresh snake
pub const INITIAL_SNAKE_LENGTH: usize = 5;

/// Step period of the server clock (milliseconds)
pub const GAME_SPEED_MS: u64 = 100;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;
