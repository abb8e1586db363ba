//! Wire envelopes
//!
//! Inbound frames are JSON objects carrying a `type` tag and a `roomId`; every
//! other field is opaque and relayed untouched. The only frame the server
//! builds itself is the `peer-joined` notice.

use crate::error::ClientRequestError;
use crate::state::RoomId;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Recognized message tags plus a catch-all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Join,
    Offer,
    Answer,
    IceCandidate,
    Chat,
    Unknown(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Join => "join",
            MessageType::Offer => "offer",
            MessageType::Answer => "answer",
            MessageType::IceCandidate => "ice-candidate",
            MessageType::Chat => "chat",
            MessageType::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for MessageType {
    fn from(tag: &str) -> Self {
        match tag {
            "join" => MessageType::Join,
            "offer" => MessageType::Offer,
            "answer" => MessageType::Answer,
            "ice-candidate" => MessageType::IceCandidate,
            "chat" => MessageType::Chat,
            other => MessageType::Unknown(other.to_owned()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The routing-relevant part of an inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: MessageType,
    pub room_id: RoomId,
}

impl FromStr for Envelope {
    type Err = ClientRequestError;

    /// Malformed JSON yields [`ClientRequestError::Json`]; a frame without a
    /// usable `roomId` yields [`ClientRequestError::MissingRoomId`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_json::from_str(s)?;
        let room_id = RoomId::new(field_text(&value, "roomId"))
            .ok_or(ClientRequestError::MissingRoomId)?;
        let kind = MessageType::from(field_text(&value, "type").as_str());
        Ok(Self { kind, room_id })
    }
}

/// Text form of a scalar field; missing, null and structured values read as ""
fn field_text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Frame the server synthesizes when a peer joins a room
#[derive(Debug, Serialize)]
pub struct PeerJoined<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "roomId")]
    room_id: &'a RoomId,
    data: Option<Value>,
}

impl<'a> PeerJoined<'a> {
    pub fn new(room_id: &'a RoomId) -> Self {
        Self {
            kind: "peer-joined",
            room_id,
            data: None,
        }
    }
}

impl fmt::Display for PeerJoined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
