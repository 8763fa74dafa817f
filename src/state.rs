//! Client-visible session state machine.
//!
//! `LoggedOut → Handshaking → Chatting`, with `Closed` reachable from every
//! state. The machine is fed one [`SessionEvent`] at a time and never touches
//! the network itself: outgoing traffic goes through the outbound queue held
//! by the established session.
//!
//! The transcript is stored encrypted. System lines (presence changes) are
//! sealed with the session key too, so every entry is handled the same way
//! when it is displayed. The key is released when the session closes, after
//! which the transcript can no longer be opened.

use tracing::{debug, info, warn};

use crate::config::RoomCredential;
use crate::crypto::{open_text, seal_text, SessionKey};
use crate::error::{ChatError, TransportError};
use crate::events::{ErrorKind, EstablishedSession, SessionEvent};
use crate::identity::{unix_now, Identity};
use crate::protocol::{ChatMessage, Envelope, PresenceEvent};
use crate::pump::Enqueued;

/// Placeholder shown for entries that fail to decrypt.
pub const DECRYPTION_ERROR_PLACEHOLDER: &str = "[Decryption Error]";

/// Observable phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Login form.
    LoggedOut,
    /// Connecting and running the handshake.
    Handshaking,
    /// Secure session established.
    Chatting,
    /// Terminal.
    Closed,
}

/// Who wrote a transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    /// The local user.
    You,
    /// Another room member, by user id.
    Peer(String),
    /// Generated locally (presence changes).
    System,
}

/// One stored transcript entry. `ciphertext` is what travelled on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Who wrote it.
    pub author: Author,
    /// Sealed content.
    pub ciphertext: Vec<u8>,
    /// Unix seconds.
    pub timestamp: i64,
}

/// A transcript entry rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    /// Who wrote it.
    pub author: Author,
    /// Decrypted text, hex ciphertext, or the decryption placeholder.
    pub text: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// What happened to an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for sending and echoed locally.
    Sent,
    /// Blank input; nothing was done.
    Ignored,
    /// The outbound queue was full; the message was discarded.
    Dropped,
}

enum Phase {
    LoggedOut,
    Handshaking {
        room_id: String,
    },
    Chatting {
        room_id: String,
        session: EstablishedSession,
    },
    Closed,
}

/// The client state machine.
pub struct ChatSessionState {
    identity: Identity,
    phase: Phase,
    transcript: Vec<TranscriptEntry>,
    reveal: bool,
    last_error: Option<String>,
    max_message_len: usize,
}

impl ChatSessionState {
    /// Fresh state on the login screen.
    pub fn new(identity: Identity, max_message_len: usize) -> Self {
        Self {
            identity,
            phase: Phase::LoggedOut,
            transcript: Vec::new(),
            reveal: true,
            last_error: None,
            max_message_len,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        match self.phase {
            Phase::LoggedOut => SessionPhase::LoggedOut,
            Phase::Handshaking { .. } => SessionPhase::Handshaking,
            Phase::Chatting { .. } => SessionPhase::Chatting,
            Phase::Closed => SessionPhase::Closed,
        }
    }

    /// The local identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Room being joined or chatted in.
    pub fn room_id(&self) -> Option<&str> {
        match &self.phase {
            Phase::Handshaking { room_id } | Phase::Chatting { room_id, .. } => Some(room_id),
            _ => None,
        }
    }

    /// Stored transcript, oldest first.
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Most recent user-visible error.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Maximum outgoing message length in characters.
    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    /// Whether decrypted text (rather than ciphertext) is shown.
    pub fn is_revealed(&self) -> bool {
        self.reveal
    }

    /// Switch between decrypted text and hex ciphertext.
    pub fn toggle_reveal(&mut self) {
        self.reveal = !self.reveal;
    }

    /// Validate the login form and move to `Handshaking`.
    ///
    /// The returned credential is what the caller connects with.
    pub fn confirm_login(&mut self, room_id: &str, password: &str) -> Result<RoomCredential, ChatError> {
        if !matches!(self.phase, Phase::LoggedOut) {
            return Err(ChatError::AlreadyStarted);
        }

        let credential = match RoomCredential::new(room_id.trim(), password) {
            Ok(credential) => credential,
            Err(e) => {
                self.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        info!(room = credential.room_id(), "joining room");
        self.last_error = None;
        self.phase = Phase::Handshaking {
            room_id: credential.room_id().to_string(),
        };
        Ok(credential)
    }

    /// Apply one event.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::HandshakeComplete(session) => self.on_established(session),
            SessionEvent::ChatMessageReceived(message) => self.on_message(message),
            SessionEvent::PresenceReceived(presence) => self.on_presence(presence),
            SessionEvent::AckReceived(ack) => {
                debug!(payload = %ack.payload, "server acknowledgment");
            }
            SessionEvent::Error { kind, detail } => self.on_error(kind, detail),
            SessionEvent::ConnectionLost(e) => self.on_connection_lost(e),
        }
    }

    /// Encrypt, enqueue and echo an outgoing message.
    pub fn send_message(&mut self, text: &str) -> Result<SendOutcome, ChatError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        let len = text.chars().count();
        if len > self.max_message_len {
            return Err(ChatError::MessageRejected(format!(
                "{} characters (max: {})",
                len, self.max_message_len
            )));
        }

        let Phase::Chatting { session, .. } = &self.phase else {
            return Err(ChatError::NotConnected);
        };

        let ciphertext = seal_text(text, &session.key)?;
        let envelope = Envelope::Message(ChatMessage {
            content: ciphertext.clone(),
            user_id: self.identity.user_id().to_string(),
            timestamp: unix_now(),
        });

        let outcome = session
            .outbound
            .enqueue_envelope(&envelope)
            .map_err(|e| ChatError::SerializationFailed(e.to_string()))?;

        match outcome {
            Enqueued::Queued => {
                self.push_entry(Author::You, ciphertext);
                Ok(SendOutcome::Sent)
            }
            Enqueued::Dropped => {
                warn!("outbound queue full, message dropped");
                Ok(SendOutcome::Dropped)
            }
            Enqueued::Closed => Err(TransportError::ConnectionClosed.into()),
        }
    }

    /// Leave the session. Dropping the outbound queue closes the connection.
    pub fn quit(&mut self) {
        if !matches!(self.phase, Phase::Closed) {
            info!("session closed by user");
        }
        self.close();
    }

    /// Transcript as display lines, honoring the reveal flag.
    pub fn visible_lines(&self) -> Vec<TranscriptLine> {
        let key = self.key();
        self.transcript
            .iter()
            .map(|entry| TranscriptLine {
                author: entry.author.clone(),
                text: self.render(entry, key),
                timestamp: entry.timestamp,
            })
            .collect()
    }

    fn render(&self, entry: &TranscriptEntry, key: Option<&SessionKey>) -> String {
        if !self.reveal {
            return hex::encode(&entry.ciphertext);
        }
        key.and_then(|key| open_text(&entry.ciphertext, key).ok())
            .unwrap_or_else(|| DECRYPTION_ERROR_PLACEHOLDER.to_string())
    }

    fn key(&self) -> Option<&SessionKey> {
        match &self.phase {
            Phase::Chatting { session, .. } => Some(session.key.as_ref()),
            _ => None,
        }
    }

    fn on_established(&mut self, session: EstablishedSession) {
        let room_id = match std::mem::replace(&mut self.phase, Phase::LoggedOut) {
            Phase::Handshaking { room_id } => room_id,
            other => {
                // Quit raced the handshake; dropping the session closes it.
                debug!("handshake completed outside handshaking phase, discarding");
                self.phase = other;
                return;
            }
        };

        let presence = Envelope::Presence(PresenceEvent {
            status: self.identity.status(),
            user_id: self.identity.user_id().to_string(),
            timestamp: self.identity.timestamp(),
        });
        match session.outbound.enqueue_envelope(&presence) {
            Ok(Enqueued::Queued) => {}
            Ok(outcome) => warn!(?outcome, "presence announcement not queued"),
            Err(e) => warn!(error = %e, "failed to encode presence announcement"),
        }

        info!(room = %room_id, user_id = self.identity.user_id(), "chatting");
        self.phase = Phase::Chatting { room_id, session };
    }

    fn on_message(&mut self, message: ChatMessage) {
        if !matches!(self.phase, Phase::Chatting { .. }) {
            debug!("message outside chatting phase, ignoring");
            return;
        }
        if message.user_id == self.identity.user_id() {
            return;
        }
        self.transcript.push(TranscriptEntry {
            author: Author::Peer(message.user_id),
            ciphertext: message.content,
            timestamp: message.timestamp,
        });
    }

    fn on_presence(&mut self, presence: PresenceEvent) {
        let Phase::Chatting { session, .. } = &self.phase else {
            debug!("presence outside chatting phase, ignoring");
            return;
        };
        let line = format!("User {} is {}", presence.user_id, presence.status);
        let ciphertext = match seal_text(&line, &session.key) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                warn!(error = %e, "failed to seal presence line");
                return;
            }
        };
        self.transcript.push(TranscriptEntry {
            author: Author::System,
            ciphertext,
            timestamp: presence.timestamp,
        });
    }

    fn on_error(&mut self, kind: ErrorKind, detail: String) {
        match kind {
            ErrorKind::Decode => {
                debug!(%detail, "inbound frame skipped");
                self.last_error = Some(detail);
            }
            ErrorKind::Handshake => {
                if matches!(self.phase, Phase::Handshaking { .. }) {
                    warn!(%detail, "handshake failed");
                    self.last_error = Some(format!("Handshake failed: {}", detail));
                    self.close();
                }
            }
        }
    }

    fn on_connection_lost(&mut self, error: TransportError) {
        if matches!(self.phase, Phase::Closed) {
            return;
        }
        warn!(error = %error, "connection lost");
        self.last_error = Some(error.to_string());
        self.close();
    }

    /// Dropping the established session releases the outbound queue and the
    /// state's handle on the session key.
    fn close(&mut self) {
        self.phase = Phase::Closed;
    }

    fn push_entry(&mut self, author: Author, ciphertext: Vec<u8>) {
        self.transcript.push(TranscriptEntry {
            author,
            ciphertext,
            timestamp: unix_now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::SESSION_KEY_LEN;
    use crate::protocol::{self, AckEvent, PresenceStatus};
    use crate::pump::{OutboundQueue, OutboundReceiver};

    fn key() -> Arc<SessionKey> {
        Arc::new(SessionKey::from_bytes([7u8; SESSION_KEY_LEN]))
    }

    fn chatting(capacity: usize) -> (ChatSessionState, OutboundReceiver, Arc<SessionKey>) {
        let mut state = ChatSessionState::new(Identity::with_user_id("me000001"), 280);
        state.confirm_login("dev-chat", "correct-horse").unwrap();

        let key = key();
        let (outbound, queue) = OutboundQueue::bounded(capacity);
        state.handle(SessionEvent::HandshakeComplete(EstablishedSession {
            key: key.clone(),
            outbound,
        }));
        (state, queue, key)
    }

    fn peer_message(user_id: &str, text: &str, key: &SessionKey) -> SessionEvent {
        SessionEvent::ChatMessageReceived(ChatMessage {
            content: seal_text(text, key).unwrap(),
            user_id: user_id.to_string(),
            timestamp: 42,
        })
    }

    #[test]
    fn test_login_validation() {
        let mut state = ChatSessionState::new(Identity::generate(), 280);

        assert!(state.confirm_login("", "pw").is_err());
        assert!(state.confirm_login("room", "").is_err());
        assert_eq!(state.phase(), SessionPhase::LoggedOut);
        assert!(state.last_error().is_some());

        let credential = state.confirm_login("dev-chat", "correct-horse").unwrap();
        assert_eq!(credential.room_id(), "dev-chat");
        assert_eq!(state.phase(), SessionPhase::Handshaking);
        assert_eq!(state.room_id(), Some("dev-chat"));
        assert!(state.last_error().is_none());

        assert!(matches!(
            state.confirm_login("other", "pw"),
            Err(ChatError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_handshake_complete_announces_presence() {
        let (state, mut queue, _key) = chatting(4);
        assert_eq!(state.phase(), SessionPhase::Chatting);

        let sent = queue.recv().await.unwrap();
        match protocol::decode(sent.as_bytes()).unwrap() {
            Envelope::Presence(p) => {
                assert_eq!(p.status, PresenceStatus::Connected);
                assert_eq!(p.user_id, "me000001");
            }
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_message_encrypts_and_echoes() {
        let (mut state, mut queue, key) = chatting(4);
        let _presence = queue.recv().await.unwrap();

        assert_eq!(state.send_message("hello").unwrap(), SendOutcome::Sent);

        let sent = queue.recv().await.unwrap();
        let message = match protocol::decode(sent.as_bytes()).unwrap() {
            Envelope::Message(m) => m,
            other => panic!("unexpected envelope: {:?}", other),
        };
        assert_eq!(message.user_id, "me000001");
        assert_eq!(open_text(&message.content, &key).unwrap(), "hello");
        assert!(!sent.contains("hello"));

        let lines = state.visible_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].author, Author::You);
        assert_eq!(lines[0].text, "hello");
    }

    #[test]
    fn test_send_limits() {
        let (mut state, _queue, _key) = chatting(4);

        assert_eq!(state.send_message("   ").unwrap(), SendOutcome::Ignored);
        assert!(matches!(
            state.send_message(&"x".repeat(281)),
            Err(ChatError::MessageRejected(_))
        ));
        assert_eq!(state.send_message(&"x".repeat(280)).unwrap(), SendOutcome::Sent);
    }

    #[test]
    fn test_send_requires_chatting() {
        let mut state = ChatSessionState::new(Identity::generate(), 280);
        assert!(matches!(state.send_message("hi"), Err(ChatError::NotConnected)));
    }

    #[test]
    fn test_full_queue_drops_without_echo() {
        // Capacity 1 is taken by the presence announcement.
        let (mut state, _queue, _key) = chatting(1);
        assert_eq!(state.send_message("hello").unwrap(), SendOutcome::Dropped);
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn test_inbound_message_and_self_echo() {
        let (mut state, _queue, key) = chatting(4);

        state.handle(peer_message("me000001", "mine", &key));
        state.handle(peer_message("peer0002", "hello", &key));

        let lines = state.visible_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].author, Author::Peer("peer0002".to_string()));
        assert_eq!(lines[0].text, "hello");
        assert_eq!(lines[0].timestamp, 42);
    }

    #[test]
    fn test_wrong_key_shows_placeholder() {
        let (mut state, _queue, _key) = chatting(4);
        let other = SessionKey::from_bytes([9u8; SESSION_KEY_LEN]);

        state.handle(peer_message("peer0002", "secret", &other));

        let lines = state.visible_lines();
        assert_eq!(lines[0].text, DECRYPTION_ERROR_PLACEHOLDER);
        assert_eq!(state.phase(), SessionPhase::Chatting);
    }

    #[test]
    fn test_presence_becomes_sealed_system_line() {
        let (mut state, _queue, _key) = chatting(4);

        state.handle(SessionEvent::PresenceReceived(PresenceEvent {
            status: PresenceStatus::Disconnected,
            user_id: "peer0002".to_string(),
            timestamp: 7,
        }));

        let entry = &state.transcript()[0];
        assert_eq!(entry.author, Author::System);
        assert!(!String::from_utf8_lossy(&entry.ciphertext).contains("peer0002"));
        assert_eq!(state.visible_lines()[0].text, "User peer0002 is disconnected");
    }

    #[test]
    fn test_reveal_toggle_shows_hex() {
        let (mut state, _queue, key) = chatting(4);
        state.handle(peer_message("peer0002", "hello", &key));

        assert!(state.is_revealed());
        state.toggle_reveal();
        let ciphertext = state.transcript()[0].ciphertext.clone();
        assert_eq!(state.visible_lines()[0].text, hex::encode(ciphertext));

        state.toggle_reveal();
        assert_eq!(state.visible_lines()[0].text, "hello");
    }

    #[test]
    fn test_ack_and_decode_errors_are_not_fatal() {
        let (mut state, _queue, _key) = chatting(4);

        state.handle(SessionEvent::AckReceived(AckEvent {
            payload: "ok".to_string(),
        }));
        state.handle(SessionEvent::Error {
            kind: ErrorKind::Decode,
            detail: "bad frame".to_string(),
        });

        assert_eq!(state.phase(), SessionPhase::Chatting);
        assert_eq!(state.last_error(), Some("bad frame"));
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn test_handshake_error_closes() {
        let mut state = ChatSessionState::new(Identity::generate(), 280);
        state.confirm_login("dev-chat", "pw").unwrap();

        state.handle(SessionEvent::Error {
            kind: ErrorKind::Handshake,
            detail: "Handshake cryptographic failure".to_string(),
        });

        assert_eq!(state.phase(), SessionPhase::Closed);
        assert!(state.last_error().unwrap().contains("Handshake failed"));
    }

    #[tokio::test]
    async fn test_connection_lost_closes_and_releases_key() {
        let (mut state, mut queue, key) = chatting(4);
        state.handle(peer_message("peer0002", "hello", &key));
        assert_eq!(state.visible_lines()[0].text, "hello");
        assert_eq!(Arc::strong_count(&key), 2);

        state.handle(SessionEvent::ConnectionLost(TransportError::ConnectionClosed));
        assert_eq!(state.phase(), SessionPhase::Closed);
        assert_eq!(state.last_error(), Some("Connection closed"));

        // Only the test's handle is left; the transcript can no longer be opened.
        assert_eq!(Arc::strong_count(&key), 1);
        assert_eq!(state.visible_lines()[0].text, DECRYPTION_ERROR_PLACEHOLDER);
        state.toggle_reveal();
        assert_eq!(
            state.visible_lines()[0].text,
            hex::encode(&state.transcript()[0].ciphertext)
        );

        // The queue producer is gone once the session is closed.
        let _presence = queue.recv().await.unwrap();
        assert!(queue.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_quit_during_handshake_discards_session() {
        let mut state = ChatSessionState::new(Identity::generate(), 280);
        state.confirm_login("dev-chat", "pw").unwrap();
        state.quit();
        assert_eq!(state.phase(), SessionPhase::Closed);

        let (outbound, mut queue) = OutboundQueue::bounded(4);
        state.handle(SessionEvent::HandshakeComplete(EstablishedSession {
            key: key(),
            outbound,
        }));

        assert_eq!(state.phase(), SessionPhase::Closed);
        assert!(queue.recv().await.is_none());
    }
}
