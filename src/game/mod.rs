//! Game Logic Module
//!
//! All game simulation code. 100% deterministic given the RNG seed.
//!
//! ## Module Structure
//!
//! - `direction`: Headings and the reversal guard
//! - `state`: Game state, frame clock, configuration
//! - `collision`: Wall and self collision checks
//! - `food`: Food placement policies
//! - `step`: The simulation engine (init, step, place food, replay)

pub mod collision;
pub mod direction;
pub mod food;
pub mod state;
pub mod step;

// Re-export key types
pub use collision::ResetCause;
pub use direction::Direction;
pub use food::FoodPolicy;
pub use state::{FrameClock, GameConfig, GameState};
pub use step::{Simulation, StepOutcome};
