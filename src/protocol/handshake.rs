//! Password-authenticated key exchange (SPAKE2 over Ed25519).
//!
//! ## Flow (client role)
//!
//! 1. Start a PAKE instance seeded with the room password
//! 2. Wait for the server's public value (one binary frame)
//! 3. Feed it into the instance
//! 4. Send our own public value (one binary frame)
//! 5. Extract the shared secret
//!
//! The exchange is a single round with no key confirmation. A peer with a
//! different password completes it too, but ends up with a different secret.

use spake2::{Ed25519Group, Identity, Password, Spake2};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::HandshakeError;
use crate::transport::{Connection, Frame, FrameSink, FrameSource};

/// Identity string binding both sides of the symmetric exchange.
const PAKE_IDENTITY: &[u8] = b"pakechat-room-v1";

/// Length of the extracted shared secret.
pub const SHARED_SECRET_LEN: usize = 32;

/// Secret produced by a completed exchange.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for SharedSecret {}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// A started exchange waiting for the peer's public value.
pub struct HandshakeState {
    spake: Spake2<Ed25519Group>,
    outbound: Vec<u8>,
}

impl HandshakeState {
    /// Start an exchange seeded with `password`.
    pub fn start(password: &str) -> Self {
        let (spake, outbound) = Spake2::<Ed25519Group>::start_symmetric(
            &Password::new(password.as_bytes()),
            &Identity::new(PAKE_IDENTITY),
        );
        Self { spake, outbound }
    }

    /// Our public value, to be sent to the peer.
    pub fn outbound(&self) -> &[u8] {
        &self.outbound
    }

    /// Feed the peer's public value, consuming the state.
    pub fn update(self, peer_message: &[u8]) -> Result<CompletedHandshake, HandshakeError> {
        let secret = self
            .spake
            .finish(peer_message)
            .map_err(|_| HandshakeError::CryptoFailure)?;

        Ok(CompletedHandshake {
            outbound: self.outbound,
            secret: Zeroizing::new(secret),
        })
    }
}

/// An exchange that has accepted the peer's value.
pub struct CompletedHandshake {
    outbound: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
}

impl CompletedHandshake {
    /// Our public value, still owed to the peer.
    pub fn outbound(&self) -> &[u8] {
        &self.outbound
    }

    /// Extract the shared secret, consuming the exchange.
    pub fn into_secret(self) -> Result<SharedSecret, HandshakeError> {
        if self.secret.len() != SHARED_SECRET_LEN {
            return Err(HandshakeError::KeyExtractionFailed);
        }
        Ok(SharedSecret(self.secret))
    }
}

/// Run the client side of the handshake.
pub async fn begin_handshake<K, S>(
    password: &str,
    conn: &mut Connection<K, S>,
) -> Result<SharedSecret, HandshakeError>
where
    K: FrameSink,
    S: FrameSource,
{
    let state = HandshakeState::start(password);

    let server_point = match conn.receive().await? {
        Frame::Binary(data) => data,
        Frame::Text(_) => {
            return Err(HandshakeError::ProtocolViolation(
                "expected binary handshake frame, got text".to_string(),
            ))
        }
    };
    debug!(len = server_point.len(), "received server handshake value");

    let completed = state.update(&server_point)?;
    conn.send(Frame::Binary(completed.outbound().to_vec())).await?;

    completed.into_secret()
}

/// Run the server side of the handshake: send first, then receive.
///
/// Used by loopback room servers.
pub async fn answer_handshake<K, S>(
    password: &str,
    conn: &mut Connection<K, S>,
) -> Result<SharedSecret, HandshakeError>
where
    K: FrameSink,
    S: FrameSource,
{
    let state = HandshakeState::start(password);
    conn.send(Frame::Binary(state.outbound().to_vec())).await?;

    let client_point = match conn.receive().await? {
        Frame::Binary(data) => data,
        Frame::Text(_) => {
            return Err(HandshakeError::ProtocolViolation(
                "expected binary handshake frame, got text".to_string(),
            ))
        }
    };

    state.update(&client_point)?.into_secret()
}
