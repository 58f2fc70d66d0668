//! Food Placement
//!
//! Chooses the next food cell from the seeded RNG.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::grid::{GridBounds, Position};
use crate::core::rng::DeterministicRng;

/// How a food cell is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodPolicy {
    /// Uniform over cells the snake does not occupy.
    #[default]
    AvoidSnake,
    /// Uniform over the whole grid; may land on the snake.
    Uniform,
}

/// Unknown food policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown food policy {0:?} (expected \"avoid\" or \"uniform\")")]
pub struct ParseFoodPolicyError(pub String);

impl FromStr for FoodPolicy {
    type Err = ParseFoodPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avoid" | "avoid_snake" => Ok(FoodPolicy::AvoidSnake),
            "uniform" => Ok(FoodPolicy::Uniform),
            _ => Err(ParseFoodPolicyError(s.to_string())),
        }
    }
}

/// Pick a food cell.
///
/// `AvoidSnake` draws one index among the free cells, so it always consumes
/// exactly one RNG value and never loops. With no free cell left it falls
/// back to a uniform draw.
pub fn choose_food_cell<'a, I>(
    rng: &mut DeterministicRng,
    bounds: &GridBounds,
    policy: FoodPolicy,
    occupied: I,
) -> Position
where
    I: IntoIterator<Item = &'a Position>,
{
    match policy {
        FoodPolicy::Uniform => rng.random_cell(bounds),
        FoodPolicy::AvoidSnake => {
            let columns = bounds.columns().max(1);
            let mut taken = vec![false; bounds.cell_count() as usize];
            for pos in occupied {
                if bounds.contains(*pos) {
                    let index = (pos.y / bounds.cell_size) * columns + pos.x / bounds.cell_size;
                    taken[index as usize] = true;
                }
            }

            let free: Vec<Position> = bounds
                .cells()
                .zip(taken.iter())
                .filter(|(_, t)| !**t)
                .map(|(cell, _)| cell)
                .collect();

            match rng.choose(&free) {
                Some(cell) => *cell,
                None => rng.random_cell(bounds),
            }
        }
    }
}
