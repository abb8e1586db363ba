//! Message routing for connected peers
//!
//! Every inbound text frame is handled on its own: parse the envelope, record
//! the sender's membership in the frame's room, then either announce a join
//! or relay the frame verbatim to the rest of the room.

use crate::broadcast::{BroadcastReport, broadcast};
use crate::connection::{ConnectionId, SharedConnection};
use crate::error::ClientRequestError;
use crate::message::{Envelope, MessageType, PeerJoined};
use crate::state::{RoomId, RoomRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a frame that was routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// A `join` was announced as `peer-joined`
    Announced(BroadcastReport),
    /// The frame was relayed unchanged
    Relayed(BroadcastReport),
}

/// Routes inbound frames through a shared [`RoomRegistry`]
#[derive(Clone, Default)]
pub struct MessageRouter {
    registry: Arc<RoomRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Handle one inbound text frame from `sender`.
    ///
    /// An `Err` means the frame was dropped. It has already been logged and
    /// nothing is reported back to the client.
    pub fn handle_message(
        &self,
        sender: &SharedConnection,
        text: &str,
    ) -> Result<Routed, ClientRequestError> {
        let id = sender.id();
        debug!("Received message from connection {}: {}", id, text);

        let Envelope { kind, room_id } = match text.parse::<Envelope>() {
            Ok(envelope) => envelope,
            Err(ClientRequestError::MissingRoomId) => {
                warn!("Received message with empty roomId from connection {}. Ignoring...", id);
                return Err(ClientRequestError::MissingRoomId);
            }
            Err(e) => {
                warn!("Dropping malformed message from connection {}: {}", id, e);
                return Err(e);
            }
        };

        if self.registry.ensure_member(&room_id, sender) {
            info!("Added connection {} to room {}", id, room_id);
        }

        match kind {
            MessageType::Join => {
                info!("Connection {} joined room {}", id, room_id);
                let notice = PeerJoined::new(&room_id).to_string();
                Ok(Routed::Announced(self.broadcast(&room_id, id, &notice)))
            }
            MessageType::Offer
            | MessageType::Answer
            | MessageType::IceCandidate
            | MessageType::Chat => {
                info!("Received {} from connection {} in room {}", kind, id, room_id);
                Ok(Routed::Relayed(self.broadcast(&room_id, id, text)))
            }
            MessageType::Unknown(tag) => {
                warn!("Unknown message type '{}' from connection {}", tag, id);
                Err(ClientRequestError::UnsupportedType(tag))
            }
        }
    }

    /// Drop a closed connection from every room
    pub fn handle_close(&self, id: ConnectionId, reason: impl fmt::Display) -> Vec<RoomId> {
        info!("Connection closed for connection {} (status: {})", id, reason);
        self.registry.remove_everywhere(id)
    }

    fn broadcast(&self, room_id: &RoomId, sender: ConnectionId, payload: &str) -> BroadcastReport {
        let report = broadcast(&self.registry, room_id, sender, payload);
        if report.failed > 0 {
            warn!(
                "Broadcast in room {} reached {} of {} peers",
                room_id,
                report.delivered,
                report.delivered + report.failed
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::RecordingConnection;

    struct Peer {
        conn: Arc<RecordingConnection>,
        shared: SharedConnection,
    }

    impl Peer {
        fn new() -> Self {
            let conn = RecordingConnection::new();
            let shared: SharedConnection = conn.clone();
            Self { conn, shared }
        }
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id).unwrap()
    }

    #[test]
    fn join_announces_peer_joined_to_others() {
        let router = MessageRouter::default();
        let (a, b, c) = (Peer::new(), Peer::new(), Peer::new());
        router.handle_message(&b.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();
        router.handle_message(&c.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();
        let before_b = b.conn.received().len();
        let before_c = c.conn.received().len();

        let routed = router
            .handle_message(&a.shared, r#"{"type":"join","roomId":"r1","name":"alice"}"#)
            .unwrap();

        let notice = r#"{"type":"peer-joined","roomId":"r1","data":null}"#;
        assert!(matches!(routed, Routed::Announced(r) if r.delivered == 2));
        assert_eq!(b.conn.received()[before_b..], [notice.to_string()]);
        assert_eq!(c.conn.received()[before_c..], [notice.to_string()]);
        assert!(a.conn.received().is_empty());
    }

    #[test]
    fn relayed_types_are_forwarded_verbatim() {
        let router = MessageRouter::default();
        let (a, b) = (Peer::new(), Peer::new());
        router.handle_message(&a.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();
        router.handle_message(&b.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();

        for frame in [
            r#"{"type":"offer","roomId":"r1","sdp":"X"}"#,
            r#"{ "type" : "answer", "roomId":"r1", "sdp": "Y" }"#,
            r#"{"type":"ice-candidate","roomId":"r1","candidate":{"sdpMid":"0"}}"#,
            r#"{"type":"chat","roomId":"r1","text":"hi"}"#,
        ] {
            let routed = router.handle_message(&a.shared, frame).unwrap();
            assert!(matches!(routed, Routed::Relayed(r) if r.delivered == 1));
            assert_eq!(b.conn.received().last().map(String::as_str), Some(frame));
        }
        // a only ever got b's peer-joined
        assert_eq!(a.conn.received().len(), 1);
    }

    #[test]
    fn rooms_are_isolated() {
        let router = MessageRouter::default();
        let (a, b, c) = (Peer::new(), Peer::new(), Peer::new());
        router.handle_message(&a.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();
        router.handle_message(&b.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();
        router.handle_message(&c.shared, r#"{"type":"join","roomId":"r2"}"#).unwrap();

        router
            .handle_message(&a.shared, r#"{"type":"chat","roomId":"r1","text":"hi"}"#)
            .unwrap();

        assert!(c.conn.received().is_empty());
    }

    #[test]
    fn any_valid_message_creates_membership() {
        let router = MessageRouter::default();
        let (a, b) = (Peer::new(), Peer::new());

        router
            .handle_message(&a.shared, r#"{"type":"chat","roomId":"new","text":"first"}"#)
            .unwrap();
        assert_eq!(router.registry().rooms_of(a.shared.id()), vec![room("new")]);

        router
            .handle_message(&b.shared, r#"{"type":"offer","roomId":"new","sdp":"X"}"#)
            .unwrap();
        assert_eq!(
            a.conn.received(),
            vec![r#"{"type":"offer","roomId":"new","sdp":"X"}"#.to_string()]
        );
    }

    #[test]
    fn unknown_type_records_membership_without_broadcast() {
        let router = MessageRouter::default();
        let (a, b) = (Peer::new(), Peer::new());
        router.handle_message(&b.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();

        let result = router.handle_message(&a.shared, r#"{"type":"leave","roomId":"r1"}"#);

        assert!(matches!(result, Err(ClientRequestError::UnsupportedType(t)) if t == "leave"));
        assert_eq!(router.registry().member_count(&room("r1")), 2);
        assert!(b.conn.received().is_empty());
    }

    #[test]
    fn missing_room_id_changes_nothing() {
        let router = MessageRouter::default();
        let a = Peer::new();

        for frame in [r#"{"type":"join"}"#, r#"{"type":"join","roomId":""}"#] {
            let result = router.handle_message(&a.shared, frame);
            assert!(matches!(result, Err(ClientRequestError::MissingRoomId)));
        }
        assert_eq!(router.registry().room_count(), 0);
    }

    #[test]
    fn malformed_frame_is_dropped() {
        let router = MessageRouter::default();
        let a = Peer::new();

        let result = router.handle_message(&a.shared, "not json at all");

        assert!(matches!(result, Err(ClientRequestError::Json(_))));
        assert_eq!(router.registry().room_count(), 0);
    }

    #[test]
    fn close_removes_from_every_room() {
        let router = MessageRouter::default();
        let (a, b) = (Peer::new(), Peer::new());
        router.handle_message(&a.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();
        router.handle_message(&a.shared, r#"{"type":"join","roomId":"r2"}"#).unwrap();
        router.handle_message(&b.shared, r#"{"type":"join","roomId":"r1"}"#).unwrap();
        let seen = a.conn.received().len();

        let left = router.handle_close(a.shared.id(), "1000 normal");
        assert_eq!(left.len(), 2);

        router
            .handle_message(&b.shared, r#"{"type":"chat","roomId":"r1","text":"gone?"}"#)
            .unwrap();
        router
            .handle_message(&b.shared, r#"{"type":"chat","roomId":"r2","text":"gone?"}"#)
            .unwrap();
        assert_eq!(a.conn.received().len(), seen);
    }
}
