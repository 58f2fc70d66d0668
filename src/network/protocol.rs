//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Both directions are JSON text frames.
//!
//! Inbound: `{"direction": "up", "frame": 12, "ts": 1699999.5}`
//! Outbound: `{"food": {"x":..,"y":..}, "direction": "UP", "score": 3, "snake": [...]}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::grid::Position;
use crate::game::direction::Direction;
use crate::game::state::GameState;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// A decoded input message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputMessage {
    /// Requested heading; `None` when absent or not a known direction word
    pub direction: Option<Direction>,
    /// Client frame counter
    pub frame: i64,
    /// Client timestamp (milliseconds, opaque to the server)
    pub ts: f64,
}

impl InputMessage {
    /// Build a message with a valid direction.
    pub fn new(direction: Direction, frame: i64, ts: f64) -> Self {
        Self {
            direction: Some(direction),
            frame,
            ts,
        }
    }

    /// Decode and classify a text frame.
    ///
    /// - not JSON / not an object → [`ProtocolError::Malformed`] / [`ProtocolError::NotAnObject`]
    /// - bad `frame` or `ts` → [`ProtocolError::InvalidField`]
    /// - bad `direction` → accepted with `direction: None`
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Self::decode(text, true)
    }

    /// Decode a frame that only has to carry a turn.
    ///
    /// Used while the server clock drives the game. Missing `frame` and
    /// `ts` default to zero; present ones must still be valid numbers.
    pub fn from_json_turn(text: &str) -> Result<Self, ProtocolError> {
        Self::decode(text, false)
    }

    fn decode(text: &str, clock_required: bool) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        let frame = if clock_required || object.contains_key("frame") {
            read_frame(object)?
        } else {
            0
        };
        let ts = if clock_required || object.contains_key("ts") {
            read_number(object, "ts")?
        } else {
            0.0
        };
        let direction = match object.get("direction") {
            Some(Value::String(word)) => match word.parse::<Direction>() {
                Ok(direction) => Some(direction),
                Err(e) => {
                    debug!("Ignoring direction: {}", e);
                    None
                }
            },
            Some(other) => {
                debug!("Ignoring non-string direction: {}", other);
                None
            }
            None => None,
        };

        Ok(Self { direction, frame, ts })
    }

    /// Encode the way a browser client sends it (lower-case direction).
    pub fn to_json(&self) -> String {
        let mut object = Map::new();
        if let Some(direction) = self.direction {
            object.insert(
                "direction".to_string(),
                Value::String(direction.as_str().to_ascii_lowercase()),
            );
        }
        object.insert("frame".to_string(), Value::from(self.frame));
        object.insert("ts".to_string(), Value::from(self.ts));
        Value::Object(object).to_string()
    }
}

/// `frame` must be an integer. Integral floats (`3.0`) are accepted.
fn read_frame(object: &Map<String, Value>) -> Result<i64, ProtocolError> {
    let value = object.get("frame").ok_or(ProtocolError::InvalidField { field: "frame" })?;
    if let Some(frame) = value.as_i64() {
        return Ok(frame);
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(ProtocolError::InvalidField { field: "frame" }),
    }
}

fn read_number(object: &Map<String, Value>, field: &'static str) -> Result<f64, ProtocolError> {
    object
        .get(field)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .ok_or(ProtocolError::InvalidField { field })
}

/// Why an inbound frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Body is not JSON.
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Body is JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// Binary WebSocket frame.
    #[error("binary frames are not supported")]
    BinaryFrame,

    /// `frame` or `ts` is missing or not numeric.
    #[error("field `{field}` is missing or not a valid number")]
    InvalidField {
        /// Offending field name
        field: &'static str,
    },
}

/// Coarse class of a [`ProtocolError`], used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Could not be decoded at all
    Decode,
    /// Decoded but violates the message contract
    Violation,
}

impl ProtocolError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            ProtocolError::Malformed(_)
            | ProtocolError::NotAnObject
            | ProtocolError::BinaryFrame => ErrorClass::Decode,
            ProtocolError::InvalidField { .. } => ErrorClass::Violation,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Game state snapshot sent to clients.
///
/// `snake` is only present after a reset, a connect or a food event;
/// between those the client extrapolates the body itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Food cell
    pub food: Position,
    /// Current heading
    pub direction: Direction,
    /// Current score
    pub score: u32,
    /// Full body, head first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snake: Option<Vec<Position>>,
}

impl StateSnapshot {
    /// Capture the current state.
    pub fn capture(state: &GameState, include_snake: bool) -> Self {
        Self {
            food: state.food,
            direction: state.direction,
            score: state.score,
            snake: include_snake.then(|| state.snake.iter().copied().collect()),
        }
    }

    /// Copy with the body removed.
    pub fn without_snake(&self) -> Self {
        Self {
            snake: None,
            ..self.clone()
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
