//! Events delivered from the network side to the session state machine.

use std::sync::Arc;

use crate::crypto::SessionKey;
use crate::error::TransportError;
use crate::protocol::{AckEvent, ChatMessage, PresenceEvent};
use crate::pump::OutboundQueue;

/// Handles owned by the state machine once the handshake succeeded.
#[derive(Debug)]
pub struct EstablishedSession {
    /// Password-derived content key, read-only from here on.
    pub key: Arc<SessionKey>,
    /// Producer side of the outbound queue. Dropping every clone closes the
    /// connection.
    pub outbound: OutboundQueue,
}

/// Category of a non-terminal error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The handshake or key derivation failed.
    Handshake,
    /// One inbound frame could not be decoded.
    Decode,
}

/// Event consumed by the state machine, one at a time, in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// The secure session is ready.
    HandshakeComplete(EstablishedSession),
    /// A `MSG` envelope arrived.
    ChatMessageReceived(ChatMessage),
    /// A `USER` envelope arrived.
    PresenceReceived(PresenceEvent),
    /// An `ACK` envelope arrived.
    AckReceived(AckEvent),
    /// Something went wrong; see `kind` for whether it is fatal.
    Error {
        /// Error category.
        kind: ErrorKind,
        /// Human-readable detail.
        detail: String,
    },
    /// The inbound loop lost the connection. Sent at most once.
    ConnectionLost(TransportError),
}
