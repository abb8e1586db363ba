//! Error types for the signaling relay

use thiserror::Error;

/// Errors that can occur while serving connections
#[derive(Error, Debug)]
pub enum SignalingError {
    /// Failed to send message to peer
    #[error("Failed to send message: {0}")]
    SendError(String),

    /// The peer's channel is no longer open
    #[error("Connection closed")]
    ConnectionClosed,

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Socket error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a single inbound frame was dropped.
///
/// None of these close the connection or produce a reply to the client.
#[derive(Error, Debug)]
pub enum ClientRequestError {
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `roomId` absent or empty
    #[error("Message has no roomId")]
    MissingRoomId,

    /// Unsupported message type
    #[error("Unsupported message type '{0}'")]
    UnsupportedType(String),
}
