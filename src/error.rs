//! Error types for the chat client.
//!
//! Each concern gets its own enum so callers can decide locally whether a
//! failure is recoverable (decode, decrypt) or fatal (handshake, transport).

use thiserror::Error;

/// Errors raised by the frame transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Dialing or upgrading the connection failed.
    #[error("Failed to connect: {0}")]
    ConnectFailed(String),

    /// The peer closed the connection or the stream ended.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Writing a frame failed.
    #[error("Write failed: {0}")]
    WriteFailed(String),
}

/// Errors raised while running the PAKE handshake.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The transport failed during the handshake.
    #[error("Transport error during handshake: {0}")]
    Transport(#[from] TransportError),

    /// The server sent something other than the expected handshake frame.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The peer's PAKE message was rejected.
    ///
    /// Deliberately carries no detail: malformed and wrong inputs look the same.
    #[error("Handshake cryptographic failure")]
    CryptoFailure,

    /// The PAKE exchange did not yield a usable secret.
    #[error("Failed to extract session secret")]
    KeyExtractionFailed,

    /// Key derivation after the exchange failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Errors raised while decoding a wire envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame is not a well-formed envelope of the announced type.
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// The envelope's `type` discriminator is not one we know.
    #[error("Unknown envelope type: {0}")]
    UnknownType(String),
}

/// Errors raised while sealing content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptError {
    /// The AEAD rejected the input.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Errors raised by the authenticated cipher.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    /// Tampered data, wrong key or truncated input. Never more specific.
    #[error("Authentication failed")]
    AuthenticationFailed,
}

/// Errors raised while validating configuration and credentials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No salt was configured.
    #[error("Salt is missing")]
    MissingSalt,

    /// The configured salt is shorter than the KDF accepts.
    #[error("Salt too short: {len} bytes (min: {min})")]
    SaltTooShort {
        /// Provided length.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// Room id is empty, too long or contains characters outside `[A-Za-z0-9._-]`.
    #[error("Invalid room id: {0:?}")]
    InvalidRoomId(String),

    /// Password is empty.
    #[error("Password is empty")]
    EmptyPassword,

    /// KDF parameters rejected.
    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParams(String),
}

/// Umbrella error for chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Handshake failure.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Decode failure.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Encrypt failure.
    #[error(transparent)]
    Encrypt(#[from] EncryptError),

    /// Decrypt failure.
    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Outgoing message rejected before it reached the queue.
    #[error("Message rejected: {0}")]
    MessageRejected(String),

    /// Sending requires an established session.
    #[error("Not connected")]
    NotConnected,

    /// Login was confirmed after the session left the login screen.
    #[error("Session already started")]
    AlreadyStarted,

    /// Encoding an outgoing envelope failed.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
