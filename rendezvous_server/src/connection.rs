//! Connection handles
//!
//! The registry and broadcast engine only see [`Connection`]: an identity, an
//! open flag and a way to push a text frame. The WebSocket transport provides
//! [`ChannelConnection`], which queues frames for a per-connection writer task.

use crate::error::SignalingError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opaque identity of one connection, assigned on accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub uuid::Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One active bidirectional text channel to a participant
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Whether the transport still accepts frames for this peer
    fn is_open(&self) -> bool;

    /// Queue a text frame for delivery.
    ///
    /// Must not block on the peer's socket.
    fn send_text(&self, text: &str) -> Result<(), SignalingError>;
}

/// Shared handle as stored in the registry
pub type SharedConnection = Arc<dyn Connection>;

/// Connection backed by an unbounded queue drained by a writer task
#[derive(Debug, Clone)]
pub struct ChannelConnection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelConnection {
    /// Create a handle and the receiving end its writer task drains
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { id, sender }, receiver)
    }
}

impl Connection for ChannelConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    fn send_text(&self, text: &str) -> Result<(), SignalingError> {
        self.sender
            .send(text.to_owned())
            .map_err(|_| SignalingError::ConnectionClosed)
    }
}
