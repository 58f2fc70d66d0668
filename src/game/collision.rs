//! Collision Detection
//!
//! Checks on a candidate head before it is committed to the snake.

use serde::{Deserialize, Serialize};

use crate::core::grid::{GridBounds, Position};
use crate::game::state::GameState;

/// Why a step ended the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetCause {
    /// Head left the playfield
    Wall,
    /// Head ran into the body
    SelfCollision,
}

/// Check whether a candidate head is outside the playfield.
#[inline]
pub fn hits_wall(bounds: &GridBounds, head: Position) -> bool {
    !bounds.contains(head)
}

/// Check whether a candidate head lands on any current segment.
///
/// The tail counts: it has not moved yet when the head is tested.
#[inline]
pub fn hits_self(state: &GameState, head: Position) -> bool {
    state.occupies(head)
}

/// Run both checks in order. Wall wins when both apply.
pub fn check_candidate(
    state: &GameState,
    bounds: &GridBounds,
    head: Position,
) -> Option<ResetCause> {
    if hits_wall(bounds, head) {
        return Some(ResetCause::Wall);
    }
    if hits_self(state, head) {
        return Some(ResetCause::SelfCollision);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::GameConfig;

    #[test]
    fn test_wall_edges() {
        let bounds = GridBounds::default();
        assert!(hits_wall(&bounds, Position::new(800, 200)));
        assert!(hits_wall(&bounds, Position::new(-10, 200)));
        assert!(hits_wall(&bounds, Position::new(200, -10)));
        assert!(hits_wall(&bounds, Position::new(200, 600)));
        assert!(!hits_wall(&bounds, Position::new(790, 590)));
    }

    #[test]
    fn test_self_includes_tail() {
        let state = GameState::fresh(&GameConfig::default());
        assert!(hits_self(&state, Position::new(160, 200)));
        assert!(!hits_self(&state, Position::new(210, 200)));
    }

    #[test]
    fn test_check_order() {
        let state = GameState::fresh(&GameConfig::default());
        let bounds = GridBounds::default();

        assert_eq!(check_candidate(&state, &bounds, Position::new(210, 200)), None);
        assert_eq!(
            check_candidate(&state, &bounds, Position::new(190, 200)),
            Some(ResetCause::SelfCollision)
        );
        assert_eq!(
            check_candidate(&state, &bounds, Position::new(800, 200)),
            Some(ResetCause::Wall)
        );
    }
}
