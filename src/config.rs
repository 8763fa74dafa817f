//! Client configuration and user-supplied credentials.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::KdfParams;
use crate::error::ConfigError;

/// Default server host (host:port).
pub const DEFAULT_HOST: &str = "localhost:8080";

/// Default capacity of the outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Default capacity of the network-to-UI event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default maximum message length in characters.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 280;

/// Maximum room id length in characters.
pub const MAX_ROOM_ID_LEN: usize = 20;

/// Minimum salt length in bytes accepted by the KDF.
pub const MIN_SALT_LEN: usize = 32;

/// Header carrying the room password for server-side admission.
pub const PASSWORD_HEADER: &str = "X-Room-Password";

/// Configuration for the chat client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host, `host:port`.
    pub host: String,

    /// Capacity of the outbound queue before new items are dropped.
    pub outbound_capacity: usize,

    /// Capacity of the event channel feeding the state machine.
    pub event_capacity: usize,

    /// Maximum outgoing message length in characters.
    pub max_message_len: usize,

    /// Key-derivation cost parameters.
    pub kdf: KdfParams,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            kdf: KdfParams::default(),
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at the given host.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Room-scoped WebSocket endpoint.
    pub fn endpoint(&self, room_id: &str) -> String {
        format!("ws://{}/ws/{}", self.host, room_id)
    }
}

/// Process-wide salt for key derivation.
///
/// Not bound to a room: every room sharing a password derives the same key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Wrap raw salt material.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ConfigError::MissingSalt);
        }
        if bytes.len() < MIN_SALT_LEN {
            return Err(ConfigError::SaltTooShort {
                len: bytes.len(),
                min: MIN_SALT_LEN,
            });
        }
        Ok(Self(bytes))
    }

    /// Salt from a configured string, used byte-for-byte.
    ///
    /// The generator emits 64 hex characters; the text itself is the salt so
    /// that clients sharing one `SALT_MASTER` value agree on it.
    pub fn from_config_str(value: &str) -> Result<Self, ConfigError> {
        Self::new(value.trim().as_bytes().to_vec())
    }

    /// Raw salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Salt({} bytes)", self.0.len())
    }
}

/// Room id and password entered by the user.
#[derive(Clone)]
pub struct RoomCredential {
    room_id: String,
    password: Zeroizing<String>,
}

impl RoomCredential {
    /// Validate and build a credential.
    pub fn new(room_id: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let room_id = room_id.into();
        let password = Zeroizing::new(password.into());

        if !is_valid_room_id(&room_id) {
            return Err(ConfigError::InvalidRoomId(room_id));
        }
        if password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }

        Ok(Self { room_id, password })
    }

    /// The room id.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// The shared room password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for RoomCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomCredential")
            .field("room_id", &self.room_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn is_valid_room_id(room_id: &str) -> bool {
    let len = room_id.chars().count();
    (1..=MAX_ROOM_ID_LEN).contains(&len)
        && room_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
