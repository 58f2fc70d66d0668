//! Game State Definitions
//!
//! The single authoritative game state and the configuration it is built
//! from. A reset replaces the whole value; nothing is carried over.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::grid::{GridBounds, Position};
use crate::core::hash::{compute_state_hash, StateHash};
use crate::game::direction::Direction;
use crate::game::food::FoodPolicy;
use crate::{INITIAL_SNAKE_LENGTH, SNAKE_SIZE};

/// Default head position of a fresh snake.
pub const DEFAULT_ANCHOR: Position = Position::new(20 * SNAKE_SIZE, 20 * SNAKE_SIZE);

// =============================================================================
// CONFIG
// =============================================================================

/// Static parameters of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Playfield size and cell size
    pub bounds: GridBounds,
    /// Segments in a fresh snake
    pub initial_length: usize,
    /// Head of a fresh snake; the body extends to the left of it
    pub anchor: Position,
    /// How food cells are chosen
    pub food_policy: FoodPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bounds: GridBounds::default(),
            initial_length: INITIAL_SNAKE_LENGTH,
            anchor: DEFAULT_ANCHOR,
            food_policy: FoodPolicy::default(),
        }
    }
}

/// Invalid game configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameConfigError {
    /// Cell size must be positive.
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(i32),

    /// Width/height must be whole, non-empty multiples of the cell size.
    #[error("playfield {width}x{height} is not a whole number of {cell_size}px cells")]
    MisalignedBounds {
        /// Width in pixels
        width: i32,
        /// Height in pixels
        height: i32,
        /// Cell size in pixels
        cell_size: i32,
    },

    /// A snake needs at least one segment.
    #[error("initial snake length must be at least 1")]
    EmptySnake,

    /// Some fresh segment would start outside the grid or off-cell.
    #[error("initial snake at {anchor:?} with {length} segments does not fit the grid")]
    SnakeOutOfBounds {
        /// Configured anchor
        anchor: Position,
        /// Configured length
        length: usize,
    },
}

impl GameConfig {
    /// Check that a fresh game built from this config is legal.
    pub fn validate(&self) -> Result<(), GameConfigError> {
        let b = self.bounds;
        if b.cell_size <= 0 {
            return Err(GameConfigError::InvalidCellSize(b.cell_size));
        }
        if b.width <= 0
            || b.height <= 0
            || b.width % b.cell_size != 0
            || b.height % b.cell_size != 0
        {
            return Err(GameConfigError::MisalignedBounds {
                width: b.width,
                height: b.height,
                cell_size: b.cell_size,
            });
        }
        if self.initial_length == 0 {
            return Err(GameConfigError::EmptySnake);
        }
        let aligned = self.anchor.x % b.cell_size == 0 && self.anchor.y % b.cell_size == 0;
        let fits = fresh_snake(self).iter().all(|p| b.contains(*p));
        if !aligned || !fits {
            return Err(GameConfigError::SnakeOutOfBounds {
                anchor: self.anchor,
                length: self.initial_length,
            });
        }
        Ok(())
    }
}

/// Segments of a fresh snake, head first, laid out leftwards from the anchor.
fn fresh_snake(config: &GameConfig) -> VecDeque<Position> {
    (0..config.initial_length)
        .map(|i| config.anchor.offset(-(i as i32), 0, config.bounds.cell_size))
        .collect()
}

// =============================================================================
// FRAME CLOCK
// =============================================================================

/// Last acknowledged client frame and its timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameClock {
    /// Frame counter of the last accepted input
    pub num_frames: i64,
    /// Client timestamp of the last accepted input
    pub last_timestamp: f64,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of the shared game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Body segments, head first
    pub snake: VecDeque<Position>,

    /// Heading used by the next step
    pub direction: Direction,

    /// Current food cell
    pub food: Position,

    /// Food eaten since the last reset
    pub score: u32,

    /// `None` until the first input after (re)initialization
    pub clock: Option<FrameClock>,
}

impl GameState {
    /// Fresh state for `config`.
    ///
    /// Food sits on the origin cell until the engine places it; callers go
    /// through `Simulation::init`, which does that immediately.
    pub fn fresh(config: &GameConfig) -> Self {
        Self {
            snake: fresh_snake(config),
            direction: Direction::Right,
            food: Position::default(),
            score: 0,
            clock: None,
        }
    }

    /// Head segment.
    #[inline]
    pub fn head(&self) -> Position {
        // Length >= 1 is an invariant of every constructor and of step().
        self.snake.front().copied().unwrap_or_default()
    }

    /// Number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.snake.len()
    }

    /// Whether the snake has no segments (never true for a valid state).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snake.is_empty()
    }

    /// Whether any segment occupies `pos`.
    #[inline]
    pub fn occupies(&self, pos: Position) -> bool {
        self.snake.contains(&pos)
    }

    /// Apply a direction change through the 180° guard.
    ///
    /// Returns true if the heading is now `next`.
    pub fn set_direction(&mut self, next: Direction) -> bool {
        if self.direction.can_turn_to(next) {
            self.direction = next;
            true
        } else {
            false
        }
    }

    /// Hash of everything in the state, in a fixed order.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(|hasher| {
            hasher.update_u32(self.snake.len() as u32);
            for segment in &self.snake {
                hasher.update_position(*segment);
            }
            hasher.update_u8(self.direction as u8);
            hasher.update_position(self.food);
            hasher.update_u32(self.score);
            match self.clock {
                Some(clock) => {
                    hasher.update_bool(true);
                    hasher.update_i64(clock.num_frames);
                    hasher.update_f64(clock.last_timestamp);
                }
                None => hasher.update_bool(false),
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
