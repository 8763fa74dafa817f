//! Secure session establishment.
//!
//! Turns an unauthenticated room connection into an established session:
//! connect, run the PAKE exchange, derive the content key, then hand the
//! connection halves to the pump.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::{ClientConfig, RoomCredential, Salt};
use crate::crypto::{derive_key, SessionKey};
use crate::error::HandshakeError;
use crate::events::{ErrorKind, EstablishedSession, SessionEvent};
use crate::protocol::begin_handshake;
use crate::pump::{DuplexPump, OutboundQueue, PumpHandle};
use crate::transport::Connector;

/// Drives connection setup for one room.
pub struct SessionProtocol<C> {
    connector: C,
    salt: Salt,
    config: ClientConfig,
}

impl<C: Connector> SessionProtocol<C> {
    /// Create a protocol driver with an explicit salt and config.
    pub fn new(connector: C, salt: Salt, config: ClientConfig) -> Self {
        Self {
            connector,
            salt,
            config,
        }
    }

    /// Establish the session and start the pump.
    ///
    /// On success `HandshakeComplete` is sent on `events` before any inbound
    /// event. On failure a single `Error { kind: Handshake }` is sent and the
    /// error is returned; nothing is retried.
    pub async fn establish(
        &self,
        credential: &RoomCredential,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<PumpHandle, HandshakeError> {
        match self.try_establish(credential, &events).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                warn!(room = credential.room_id(), error = %e, "session setup failed");
                let _ = events
                    .send(SessionEvent::Error {
                        kind: ErrorKind::Handshake,
                        detail: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn try_establish(
        &self,
        credential: &RoomCredential,
        events: &mpsc::Sender<SessionEvent>,
    ) -> Result<PumpHandle, HandshakeError> {
        let mut conn = self.connector.connect(credential).await?;
        debug!(room = credential.room_id(), "connection open, starting handshake");

        let secret = begin_handshake(credential.password(), &mut conn).await?;
        // The exchanged secret only proves the server is live; content is
        // protected by the password-derived key.
        drop(secret);

        let key = self.derive(credential).await?;
        info!(room = credential.room_id(), "secure session established");

        let (sink, source) = conn.into_split();
        let (outbound, queue) = OutboundQueue::bounded(self.config.outbound_capacity);

        let established = EstablishedSession {
            key: Arc::new(key),
            outbound,
        };
        events
            .send(SessionEvent::HandshakeComplete(established))
            .await
            .map_err(|_| HandshakeError::ProtocolViolation("event consumer gone".to_string()))?;

        Ok(DuplexPump::spawn(sink, source, queue, events.clone()))
    }

    /// Derive the content key on the blocking pool.
    async fn derive(&self, credential: &RoomCredential) -> Result<SessionKey, HandshakeError> {
        let password = Zeroizing::new(credential.password().to_string());
        let salt = self.salt.clone();
        let params = self.config.kdf;

        tokio::task::spawn_blocking(move || derive_key(&password, &salt, params))
            .await
            .map_err(|e| HandshakeError::KeyDerivation(e.to_string()))?
            .map_err(|e| HandshakeError::KeyDerivation(e.to_string()))
    }
}
