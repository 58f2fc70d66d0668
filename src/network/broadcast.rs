//! Broadcast Adapter
//!
//! Fans snapshots out to connected clients. Each client has a bounded
//! mpsc channel drained by its own writer task; sends never wait.

use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::network::protocol::StateSnapshot;

/// Unique connection identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClientId(pub [u8; 16]);

impl ClientId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fresh random id.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..4]))
    }
}

/// Delivery of snapshots to clients.
///
/// `include_snake = false` strips the body from the snapshot before sending.
pub trait Broadcaster {
    /// Send to every connected client.
    fn broadcast_all(&self, snapshot: &StateSnapshot, include_snake: bool);

    /// Send to one client.
    fn send_one(&self, client: ClientId, snapshot: &StateSnapshot, include_snake: bool);
}

fn shaped(snapshot: &StateSnapshot, include_snake: bool) -> StateSnapshot {
    if include_snake {
        snapshot.clone()
    } else {
        snapshot.without_snake()
    }
}

/// Registry of live client channels.
#[derive(Debug, Default)]
pub struct ClientHub {
    clients: BTreeMap<ClientId, mpsc::Sender<StateSnapshot>>,
}

impl ClientHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client. Replaces any previous channel under the same id.
    pub fn register(&mut self, client: ClientId, sender: mpsc::Sender<StateSnapshot>) {
        self.clients.insert(client, sender);
    }

    /// Remove a client. Returns true if it was registered.
    pub fn unregister(&mut self, client: &ClientId) -> bool {
        self.clients.remove(client).is_some()
    }

    /// Whether a client is registered.
    pub fn contains(&self, client: &ClientId) -> bool {
        self.clients.contains_key(client)
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn deliver(client: ClientId, sender: &mpsc::Sender<StateSnapshot>, snapshot: StateSnapshot) {
        match sender.try_send(snapshot) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for client {}, dropping snapshot", client);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Client {} channel closed", client);
            }
        }
    }
}

impl Broadcaster for ClientHub {
    fn broadcast_all(&self, snapshot: &StateSnapshot, include_snake: bool) {
        let message = shaped(snapshot, include_snake);
        for (client, sender) in &self.clients {
            Self::deliver(*client, sender, message.clone());
        }
    }

    fn send_one(&self, client: ClientId, snapshot: &StateSnapshot, include_snake: bool) {
        match self.clients.get(&client) {
            Some(sender) => Self::deliver(client, sender, shaped(snapshot, include_snake)),
            None => debug!("send_one to unknown client {}", client),
        }
    }
}
