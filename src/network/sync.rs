//! Synchronization Controller
//!
//! Reconciles client-reported frame counters with the authoritative
//! simulation. Each input names the frame the client is on; the server
//! runs exactly the steps it owes since the last acknowledged frame.
//!
//! ## Flow
//!
//! ```text
//! input(frame=F, ts, dir)
//!   clock unset    -> record (F, ts), 0 steps
//!   clock = N      -> step (F - N) times with the current heading
//!                     broadcast on every reset / food
//!                     clock = (F, ts)
//!   then           -> turn to dir (180° guard)
//! ```

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::game::direction::Direction;
use crate::game::state::{FrameClock, GameState};
use crate::game::step::{Simulation, StepOutcome};
use crate::network::broadcast::{Broadcaster, ClientId};
use crate::network::protocol::{InputMessage, StateSnapshot};
use crate::GAME_SPEED_MS;

/// Default bound on steps run for one message.
pub const DEFAULT_MAX_CATCH_UP_STEPS: u32 = 600;

/// What drives the simulation forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Steps are owed by client frame counters.
    #[default]
    ClientFrames,
    /// A server interval steps once per tick; inputs only turn.
    ServerClock {
        /// Time between steps
        interval: Duration,
    },
}

impl SyncMode {
    /// Server clock at the classic game speed.
    pub fn classic_clock() -> Self {
        SyncMode::ServerClock {
            interval: Duration::from_millis(GAME_SPEED_MS),
        }
    }
}

/// Controller configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Stepping mode
    pub mode: SyncMode,
    /// Most steps a single message may request
    pub max_catch_up_steps: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::ClientFrames,
            max_catch_up_steps: DEFAULT_MAX_CATCH_UP_STEPS,
        }
    }
}

/// Controller policy errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// A message asked for more steps than allowed. The clock was
    /// re-baselined and the sender was sent a full snapshot.
    #[error("catch-up of {requested} steps exceeds limit of {max}")]
    CatchUpExceeded {
        /// Steps the message asked for
        requested: i64,
        /// Configured limit
        max: u32,
    },
}

/// Summary of one handled input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputReport {
    /// Whether this message only set the clock baseline
    pub bootstrapped: bool,
    /// Steps run during catch-up
    pub steps_run: u32,
    /// Whether the heading changed. Rejected reversals and repeats of the
    /// current heading leave it false.
    pub direction_applied: bool,
    /// Resets that happened during catch-up
    pub resets: u32,
    /// Food eaten during catch-up
    pub foods: u32,
}

/// Owns the authoritative game and applies client inputs to it.
#[derive(Debug)]
pub struct SyncController {
    sim: Simulation,
    config: SyncConfig,
}

impl SyncController {
    /// Wrap an engine.
    pub fn new(sim: Simulation, config: SyncConfig) -> Self {
        Self { sim, config }
    }

    /// A client joined: reset the shared game and send everyone the full state.
    pub fn connect<B: Broadcaster>(&mut self, client: ClientId, out: &B) -> StateSnapshot {
        self.sim.init();
        let snapshot = self.snapshot(true);
        out.broadcast_all(&snapshot, true);
        info!(
            "Client {} connected, game reset (food at {:?})",
            client,
            snapshot.food
        );
        snapshot
    }

    /// A client left. The game carries on unchanged.
    pub fn disconnect(&mut self, client: ClientId) {
        debug!("Client {} disconnected", client);
    }

    /// Apply one input message.
    pub fn handle_input<B: Broadcaster>(
        &mut self,
        client: ClientId,
        msg: &InputMessage,
        out: &B,
    ) -> Result<InputReport, SyncError> {
        let mut report = InputReport::default();

        if let SyncMode::ServerClock { .. } = self.config.mode {
            report.direction_applied = self.apply_direction(msg.direction);
            return Ok(report);
        }

        match self.sim.state().clock {
            None => {
                self.set_clock(msg);
                report.bootstrapped = true;
            }
            Some(clock) => {
                let owed = msg.frame.saturating_sub(clock.num_frames).max(0);
                let max = self.config.max_catch_up_steps;

                if owed > i64::from(max) {
                    self.set_clock(msg);
                    self.apply_direction(msg.direction);
                    out.send_one(client, &self.snapshot(true), true);
                    warn!(
                        "Client {} asked for {} steps (limit {}), clock re-baselined at frame {}",
                        client, owed, max, msg.frame
                    );
                    return Err(SyncError::CatchUpExceeded { requested: owed, max });
                }

                for _ in 0..owed {
                    let outcome = self.sim.step();
                    match outcome {
                        StepOutcome::Moved => {}
                        StepOutcome::Ate { score } => {
                            report.foods += 1;
                            debug!("Food eaten, score {}", score);
                        }
                        StepOutcome::Reset(cause) => {
                            report.resets += 1;
                            debug!("Game reset ({:?})", cause);
                        }
                    }
                    if outcome.needs_broadcast() {
                        out.broadcast_all(&self.snapshot(true), true);
                    }
                    report.steps_run += 1;
                }

                self.set_clock(msg);
            }
        }

        report.direction_applied = self.apply_direction(msg.direction);
        Ok(report)
    }

    /// One server-clock tick: step once and send everyone the full state.
    pub fn advance_clock<B: Broadcaster>(&mut self, out: &B) -> StepOutcome {
        let outcome = self.sim.step();
        if let StepOutcome::Reset(cause) = outcome {
            debug!("Game reset ({:?})", cause);
        }
        out.broadcast_all(&self.snapshot(true), true);
        outcome
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self, include_snake: bool) -> StateSnapshot {
        StateSnapshot::capture(self.sim.state(), include_snake)
    }

    /// Current state.
    pub fn state(&self) -> &GameState {
        self.sim.state()
    }

    /// Underlying engine.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Controller configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn set_clock(&mut self, msg: &InputMessage) {
        self.sim.state_mut().clock = Some(FrameClock {
            num_frames: msg.frame,
            last_timestamp: msg.ts,
        });
    }

    fn apply_direction(&mut self, direction: Option<Direction>) -> bool {
        let Some(next) = direction else {
            return false;
        };
        let before = self.sim.state().direction;
        self.sim.set_direction(next);
        self.sim.state().direction != before
    }
}
