//! Routes decoded envelopes to typed session events.

use crate::error::DecodeError;
use crate::events::SessionEvent;

use super::envelope::{self, Envelope};

/// Map an envelope to the event its discriminator selects.
pub fn route(envelope: Envelope) -> SessionEvent {
    match envelope {
        Envelope::Message(msg) => SessionEvent::ChatMessageReceived(msg),
        Envelope::Presence(presence) => SessionEvent::PresenceReceived(presence),
        Envelope::Ack(ack) => SessionEvent::AckReceived(ack),
    }
}

/// Decode one inbound frame and route it.
pub fn dispatch(bytes: &[u8]) -> Result<SessionEvent, DecodeError> {
    envelope::decode(bytes).map(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PresenceStatus;

    #[test]
    fn test_routes_each_known_type() {
        let msg = br#"{"type":"MSG","content":"AAEC","user_id":"u1","timestamp":3}"#;
        match dispatch(msg).unwrap() {
            SessionEvent::ChatMessageReceived(m) => {
                assert_eq!(m.content, vec![0, 1, 2]);
                assert_eq!(m.user_id, "u1");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let user = br#"{"type":"USER","status":"connected","user_id":"u2","timestamp":4}"#;
        match dispatch(user).unwrap() {
            SessionEvent::PresenceReceived(p) => assert_eq!(p.status, PresenceStatus::Connected),
            other => panic!("unexpected event: {:?}", other),
        }

        let ack = br#"{"type":"ACK","payload":"joined"}"#;
        match dispatch(ack).unwrap() {
            SessionEvent::AckReceived(a) => assert_eq!(a.payload, "joined"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_an_error_not_an_event() {
        assert_eq!(
            dispatch(br#"{"type":"PING"}"#).unwrap_err(),
            DecodeError::UnknownType("PING".to_string())
        );
    }
}
