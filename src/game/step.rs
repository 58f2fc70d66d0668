//! Authoritative Simulation Step
//!
//! The simulation engine. Everything here is deterministic given the seed:
//! the only randomness is food placement, drawn from the engine's own RNG.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::game::collision::{check_candidate, ResetCause};
use crate::game::direction::Direction;
use crate::game::food::choose_food_cell;
use crate::game::state::{GameConfig, GameState};

/// Result of one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Snake moved one cell, length unchanged
    Moved,
    /// Snake ate and grew by one
    Ate {
        /// Score after eating
        score: u32,
    },
    /// Collision; the game was reinitialized
    Reset(ResetCause),
}

impl StepOutcome {
    /// Whether this step reinitialized the game.
    #[inline]
    pub fn is_reset(self) -> bool {
        matches!(self, StepOutcome::Reset(_))
    }

    /// Whether clients must be told about this step.
    #[inline]
    pub fn needs_broadcast(self) -> bool {
        !matches!(self, StepOutcome::Moved)
    }
}

/// The simulation engine: one game state plus the RNG that feeds it.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: GameConfig,
    state: GameState,
    rng: DeterministicRng,
    steps: u64,
}

impl Simulation {
    /// Create an engine and initialize a fresh game.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let mut sim = Self {
            config,
            state: GameState::fresh(&config),
            rng: DeterministicRng::new(seed),
            steps: 0,
        };
        sim.init();
        sim
    }

    /// Create an engine around an existing state (no init, no food draw).
    pub fn with_state(config: GameConfig, state: GameState, seed: u64) -> Self {
        Self {
            config,
            state,
            rng: DeterministicRng::new(seed),
            steps: 0,
        }
    }

    /// Replace the whole state with a fresh game and place food.
    pub fn init(&mut self) {
        self.state = GameState::fresh(&self.config);
        self.place_food();
    }

    /// Move the food to a new cell chosen by the configured policy.
    pub fn place_food(&mut self) {
        self.state.food = choose_food_cell(
            &mut self.rng,
            &self.config.bounds,
            self.config.food_policy,
            &self.state.snake,
        );
    }

    /// Advance the snake one cell in the current direction.
    ///
    /// Collisions are checked on the candidate head before anything is
    /// mutated; a collision reinitializes the game.
    pub fn step(&mut self) -> StepOutcome {
        self.steps += 1;

        let (dx, dy) = self.state.direction.delta();
        let head = self.state.head().offset(dx, dy, self.config.bounds.cell_size);

        if let Some(cause) = check_candidate(&self.state, &self.config.bounds, head) {
            self.init();
            return StepOutcome::Reset(cause);
        }

        self.state.snake.push_front(head);

        if head == self.state.food {
            self.state.score += 1;
            self.place_food();
            StepOutcome::Ate { score: self.state.score }
        } else {
            self.state.snake.pop_back();
            StepOutcome::Moved
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable state, for the controller's clock and heading updates.
    #[inline]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Apply a direction change through the 180° guard.
    #[inline]
    pub fn set_direction(&mut self, next: Direction) -> bool {
        self.state.set_direction(next)
    }

    /// Game configuration.
    #[inline]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Steps taken since the engine was created, across resets.
    #[inline]
    pub fn total_steps(&self) -> u64 {
        self.steps
    }
}

/// Replay a recorded run of `(direction, steps)` segments.
///
/// Each segment first tries to turn (through the guard), then steps.
/// Returns every step outcome in order.
pub fn replay(sim: &mut Simulation, moves: &[(Direction, u32)]) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();
    for (direction, steps) in moves {
        sim.set_direction(*direction);
        for _ in 0..*steps {
            outcomes.push(sim.step());
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::Position;
    use crate::game::food::FoodPolicy;
    use crate::INITIAL_SNAKE_LENGTH;
    use proptest::prelude::*;

    fn state_with(snake: &[(i32, i32)], direction: Direction, food: (i32, i32)) -> GameState {
        GameState {
            snake: snake.iter().map(|(x, y)| Position::new(*x, *y)).collect(),
            direction,
            food: Position::new(food.0, food.1),
            score: 0,
            clock: None,
        }
    }

    #[test]
    fn test_init_scenario() {
        let sim = Simulation::new(GameConfig::default(), 1);
        let state = sim.state();

        let snake: Vec<_> = state.snake.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(snake, vec![(200, 200), (190, 200), (180, 200), (170, 200), (160, 200)]);
        assert_eq!(state.direction, Direction::Right);
        assert_eq!(state.score, 0);
        assert!(GameConfig::default().bounds.contains(state.food));
        assert!(!state.occupies(state.food));
    }

    #[test]
    fn test_plain_move_keeps_length() {
        let config = GameConfig::default();
        let state = state_with(&[(200, 200), (190, 200), (180, 200)], Direction::Right, (0, 0));
        let mut sim = Simulation::with_state(config, state, 1);

        assert_eq!(sim.step(), StepOutcome::Moved);
        let snake: Vec<_> = sim.state().snake.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(snake, vec![(210, 200), (200, 200), (190, 200)]);
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let config = GameConfig::default();
        let state = state_with(&[(200, 200), (190, 200)], Direction::Right, (210, 200));
        let mut sim = Simulation::with_state(config, state, 1);

        assert_eq!(sim.step(), StepOutcome::Ate { score: 1 });
        assert_eq!(sim.state().len(), 3);
        assert_eq!(sim.state().score, 1);
        assert_ne!(sim.state().food, Position::new(210, 200));
        assert!(!sim.state().occupies(sim.state().food));
    }

    #[test]
    fn test_right_wall_resets() {
        let config = GameConfig::default();
        let state = state_with(&[(790, 300), (780, 300)], Direction::Right, (0, 0));
        let mut sim = Simulation::with_state(config, state, 1);

        assert_eq!(sim.step(), StepOutcome::Reset(ResetCause::Wall));
        assert_eq!(sim.state().len(), INITIAL_SNAKE_LENGTH);
        assert_eq!(sim.state().head(), Position::new(200, 200));
    }

    #[test]
    fn test_left_wall_resets() {
        let config = GameConfig::default();
        let state = state_with(&[(0, 300), (10, 300)], Direction::Left, (0, 0));
        let mut sim = Simulation::with_state(config, state, 1);

        assert_eq!(sim.step(), StepOutcome::Reset(ResetCause::Wall));
    }

    #[test]
    fn test_top_and_bottom_walls_reset() {
        let config = GameConfig::default();

        let up = state_with(&[(100, 0), (100, 10)], Direction::Up, (0, 0));
        let mut sim = Simulation::with_state(config, up, 1);
        assert_eq!(sim.step(), StepOutcome::Reset(ResetCause::Wall));

        let down = state_with(&[(100, 590), (100, 580)], Direction::Down, (0, 0));
        let mut sim = Simulation::with_state(config, down, 1);
        assert_eq!(sim.step(), StepOutcome::Reset(ResetCause::Wall));
    }

    #[test]
    fn test_self_collision_resets_score() {
        // Head at (200,210) heading UP into (200,200), which is part of the loop.
        let config = GameConfig::default();
        let mut state = state_with(
            &[(200, 210), (210, 210), (210, 200), (200, 200), (190, 200)],
            Direction::Up,
            (0, 0),
        );
        state.score = 7;
        let mut sim = Simulation::with_state(config, state, 1);

        assert_eq!(sim.step(), StepOutcome::Reset(ResetCause::SelfCollision));
        assert_eq!(sim.state().score, 0);
        assert_eq!(sim.state().len(), INITIAL_SNAKE_LENGTH);
    }

    #[test]
    fn test_reset_clears_clock() {
        let config = GameConfig::default();
        let mut state = state_with(&[(790, 300)], Direction::Right, (0, 0));
        state.clock = Some(crate::game::state::FrameClock { num_frames: 10, last_timestamp: 5.0 });
        let mut sim = Simulation::with_state(config, state, 1);

        sim.step();
        assert!(sim.state().clock.is_none());
    }

    #[test]
    fn test_step_determinism() {
        let moves = [
            (Direction::Right, 30),
            (Direction::Down, 25),
            (Direction::Left, 40),
            (Direction::Up, 70),
            (Direction::Right, 100),
        ];

        let mut a = Simulation::new(GameConfig::default(), 4242);
        let mut b = Simulation::new(GameConfig::default(), 4242);
        let out_a = replay(&mut a, &moves);
        let out_b = replay(&mut b, &moves);

        assert_eq!(out_a, out_b);
        assert_eq!(a.state(), b.state());
        assert_eq!(a.state().compute_hash(), b.state().compute_hash());
        assert_eq!(a.total_steps(), 265);
    }

    #[test]
    fn test_uniform_policy_stays_in_bounds() {
        let config = GameConfig {
            bounds: crate::core::grid::GridBounds::new(20, 10, 10),
            initial_length: 1,
            anchor: Position::new(0, 0),
            food_policy: FoodPolicy::Uniform,
        };
        let sim = Simulation::new(config, 3);
        assert!(config.bounds.contains(sim.state().food));
    }

    proptest! {
        #[test]
        fn prop_growth_invariant(
            seed in any::<u64>(),
            turns in prop::collection::vec((0usize..4, 1u32..20), 1..20),
        ) {
            let mut sim = Simulation::new(GameConfig::default(), seed);
            for (d, n) in turns {
                sim.set_direction(Direction::ALL[d]);
                for _ in 0..n {
                    let before = sim.state().len();
                    match sim.step() {
                        StepOutcome::Moved => prop_assert_eq!(sim.state().len(), before),
                        StepOutcome::Ate { .. } => prop_assert_eq!(sim.state().len(), before + 1),
                        StepOutcome::Reset(_) => {
                            prop_assert_eq!(sim.state().len(), INITIAL_SNAKE_LENGTH);
                            prop_assert_eq!(sim.state().score, 0);
                        }
                    }
                    prop_assert!(sim.config().bounds.contains(sim.state().head()));
                }
            }
        }
    }
}
