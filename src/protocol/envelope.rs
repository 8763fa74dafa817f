//! Wire envelope types and the JSON codec.
//!
//! Every frame after the handshake is a UTF-8 JSON object with a string
//! `type` field. Decoding is two-phase: read the discriminator alone, then
//! decode the full record it names.

use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Discriminator for chat messages.
pub const TYPE_MSG: &str = "MSG";
/// Discriminator for presence events.
pub const TYPE_USER: &str = "USER";
/// Discriminator for acknowledgments.
pub const TYPE_ACK: &str = "ACK";

/// Encrypted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// AEAD ciphertext (nonce || ciphertext || tag), base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    /// Sender's user id.
    pub user_id: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Presence status of a room member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Joined the room.
    Connected,
    /// Left the room.
    Disconnected,
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceStatus::Connected => f.write_str("connected"),
            PresenceStatus::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Presence metadata (not encrypted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// Joined or left.
    pub status: PresenceStatus,
    /// Member's user id.
    pub user_id: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Advisory acknowledgment from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEvent {
    /// Free-form payload.
    pub payload: String,
}

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// `MSG`
    #[serde(rename = "MSG")]
    Message(ChatMessage),
    /// `USER`
    #[serde(rename = "USER")]
    Presence(PresenceEvent),
    /// `ACK`
    #[serde(rename = "ACK")]
    Ack(AckEvent),
}

/// Value of an envelope's `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discriminator {
    /// `MSG`
    Message,
    /// `USER`
    Presence,
    /// `ACK`
    Ack,
    /// Anything else, kept verbatim.
    Unknown(String),
}

impl Discriminator {
    fn parse(raw: String) -> Self {
        match raw.as_str() {
            TYPE_MSG => Discriminator::Message,
            TYPE_USER => Discriminator::Presence,
            TYPE_ACK => Discriminator::Ack,
            _ => Discriminator::Unknown(raw),
        }
    }
}

/// First-phase decode result: the discriminator and the untouched record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnvelope<'a> {
    /// The `type` field.
    pub discriminator: Discriminator,
    /// The full record bytes.
    pub record: &'a [u8],
}

#[derive(Deserialize)]
struct TypeOnly {
    #[serde(rename = "type")]
    kind: Option<serde_json::Value>,
}

/// Read only the `type` discriminator.
pub fn decode_envelope(bytes: &[u8]) -> Result<RawEnvelope<'_>, DecodeError> {
    let peek: TypeOnly =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let discriminator = match peek.kind {
        Some(serde_json::Value::String(raw)) => Discriminator::parse(raw),
        Some(_) => return Err(DecodeError::Malformed("`type` is not a string".to_string())),
        None => return Err(DecodeError::Malformed("missing `type`".to_string())),
    };

    Ok(RawEnvelope {
        discriminator,
        record: bytes,
    })
}

/// Decode the full record chosen by the discriminator.
pub fn decode_typed<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Decode a frame into a typed envelope.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let raw = decode_envelope(bytes)?;
    match raw.discriminator {
        Discriminator::Message => decode_typed(raw.record).map(Envelope::Message),
        Discriminator::Presence => decode_typed(raw.record).map(Envelope::Presence),
        Discriminator::Ack => decode_typed(raw.record).map(Envelope::Ack),
        Discriminator::Unknown(name) => Err(DecodeError::UnknownType(name)),
    }
}

/// Encode an envelope as a JSON text frame.
pub fn encode(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

mod base64_bytes {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
