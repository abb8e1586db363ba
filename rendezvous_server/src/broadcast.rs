//! Room fan-out

use crate::connection::ConnectionId;
use crate::state::{RoomId, RoomRegistry};
use tracing::{debug, warn};

/// What happened to one broadcast
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Frames handed to an open recipient
    pub delivered: usize,
    /// Members that were no longer open
    pub skipped: usize,
    /// Sends that returned an error
    pub failed: usize,
}

/// Send `payload` to every open member of `room_id` except `sender`.
///
/// Works on a snapshot of the membership taken at call time. Closed members
/// are skipped but left in the registry; the close hook removes them. A failed
/// send is logged and does not stop delivery to the rest of the room.
pub fn broadcast(
    registry: &RoomRegistry,
    room_id: &RoomId,
    sender: ConnectionId,
    payload: &str,
) -> BroadcastReport {
    let members = registry.members_of(room_id);
    let mut report = BroadcastReport::default();

    if members.is_empty() {
        warn!("No active sessions in room {} to broadcast", room_id);
        return report;
    }

    for member in members.iter().filter(|m| m.id() != sender) {
        if !member.is_open() {
            report.skipped += 1;
            continue;
        }
        match member.send_text(payload) {
            Ok(()) => {
                debug!("Sent message to connection {} in room {}", member.id(), room_id);
                report.delivered += 1;
            }
            Err(e) => {
                warn!(
                    "Failed to send to connection {} in room {}: {}",
                    member.id(),
                    room_id,
                    e
                );
                report.failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, SharedConnection};
    use crate::connection::testing::RecordingConnection;
    use std::sync::Arc;

    fn join(registry: &RoomRegistry, room_id: &RoomId, conn: &Arc<RecordingConnection>) {
        let shared: SharedConnection = conn.clone();
        registry.ensure_member(room_id, &shared);
    }

    #[test]
    fn empty_room_is_a_noop() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::new("empty").unwrap();

        let report = broadcast(&registry, &room_id, ConnectionId::new(), "hello");

        assert_eq!(report, BroadcastReport::default());
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn sender_is_excluded() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::new("r1").unwrap();
        let a = RecordingConnection::new();
        let b = RecordingConnection::new();
        join(&registry, &room_id, &a);
        join(&registry, &room_id, &b);

        let report = broadcast(&registry, &room_id, a.id(), "hi");

        assert_eq!(report.delivered, 1);
        assert!(a.received().is_empty());
        assert_eq!(b.received(), vec!["hi"]);
    }

    #[test]
    fn closed_members_are_skipped_but_kept() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::new("r1").unwrap();
        let a = RecordingConnection::new();
        let b = RecordingConnection::new();
        join(&registry, &room_id, &a);
        join(&registry, &room_id, &b);
        b.close();

        let report = broadcast(&registry, &room_id, a.id(), "hi");

        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 0);
        assert!(b.received().is_empty());
        assert_eq!(registry.member_count(&room_id), 2);
    }

    #[test]
    fn one_failed_send_does_not_stop_the_rest() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::new("r1").unwrap();
        let sender = RecordingConnection::new();
        let broken = RecordingConnection::new();
        let c = RecordingConnection::new();
        let d = RecordingConnection::new();
        for conn in [&sender, &broken, &c, &d] {
            join(&registry, &room_id, conn);
        }
        broken.fail_sends();

        let report = broadcast(&registry, &room_id, sender.id(), "hi");

        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                skipped: 0,
                failed: 1
            }
        );
        assert_eq!(c.received(), vec!["hi"]);
        assert_eq!(d.received(), vec!["hi"]);
    }
}
