//! Room-based WebRTC signaling relay over WebSockets
//!
//! Peers connect over a WebSocket, tag every message with a room, and the
//! server fans each message out to the other peers in that room. Payloads are
//! never interpreted beyond the `type` and `roomId` fields.
//!
//! # Protocol
//!
//! ## Requests (client → server)
//!
//! Text frames holding a JSON object with `type` and a non-empty `roomId`:
//! - `{"type": "join", "roomId": "<room>"}` - announce yourself to the room
//! - `{"type": "offer", "roomId": "<room>", ...}` - relayed verbatim
//! - `{"type": "answer", "roomId": "<room>", ...}` - relayed verbatim
//! - `{"type": "ice-candidate", "roomId": "<room>", ...}` - relayed verbatim
//! - `{"type": "chat", "roomId": "<room>", ...}` - relayed verbatim
//!
//! Any valid message makes the sender a member of its room. Messages without
//! a `roomId`, with an unknown `type`, or that are not JSON are dropped
//! silently. Membership ends when the socket closes.
//!
//! ## Events (server → client)
//!
//! - `{"type": "peer-joined", "roomId": "<room>", "data": null}` - another
//!   peer sent `join`
//! - any relayed message from another member, byte for byte
//!
//! # Example
//!
//! ```bash
//! # Start the server
//! RENDEZVOUS_ADDR=127.0.0.1:8080 rendezvous-signaling
//!
//! # Join a room from two terminals
//! websocat ws://127.0.0.1:8080
//! {"type":"join","roomId":"lobby"}
//! ```

#![forbid(unsafe_code)]

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod message;
pub mod server;
pub mod state;

pub use broadcast::{BroadcastReport, broadcast};
pub use config::ServerConfig;
pub use connection::{ChannelConnection, Connection, ConnectionId, SharedConnection};
pub use error::{ClientRequestError, SignalingError};
pub use handler::{MessageRouter, Routed};
pub use message::{Envelope, MessageType, PeerJoined};
pub use server::Server;
pub use state::{RoomId, RoomRegistry};
