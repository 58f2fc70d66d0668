//! Direction Input
//!
//! The four headings a snake can take, case-insensitive parsing of the
//! wire words, and the guard that forbids reversing in a single input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Heading of the snake.
///
/// Serialized upper-case (`"RIGHT"`) in outbound snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Direction {
    /// Towards y = 0
    Up = 0,
    /// Towards y = height
    Down = 1,
    /// Towards x = 0
    Left = 2,
    /// Towards x = width
    #[default]
    Right = 3,
}

impl Direction {
    /// All directions, in wire order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The 180° opposite.
    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Cell delta `(dx, dy)` for one step. Screen coordinates: up is -y.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Whether turning from `self` to `next` is allowed.
    ///
    /// Only the exact reversal is refused; repeating the current heading
    /// is a no-op turn and allowed.
    #[inline]
    pub fn can_turn_to(self, next: Direction) -> bool {
        next != self.opposite()
    }

    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A direction word that is not one of up/down/left/right.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim();
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(word))
            .ok_or_else(|| ParseDirectionError(s.to_string()))
    }
}
