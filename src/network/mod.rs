//! Network Layer
//!
//! WebSocket server, wire protocol and frame-count synchronization.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod broadcast;
pub mod protocol;
pub mod server;
pub mod sync;

pub use broadcast::{Broadcaster, ClientHub, ClientId};
pub use protocol::{ErrorClass, InputMessage, ProtocolError, StateSnapshot};
pub use server::{ConfigError, GameServer, GameServerError, ServerConfig, SharedGame};
pub use sync::{InputReport, SyncConfig, SyncController, SyncError, SyncMode};
