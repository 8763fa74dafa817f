//! Cryptographic primitives for the chat session.
//!
//! - Password-based key derivation (Argon2id)
//! - Authenticated encryption of message content (ChaCha20-Poly1305)

pub mod cipher;
pub mod kdf;

pub use cipher::{decrypt, encrypt, open_text, seal_text, NONCE_SIZE, TAG_SIZE};
pub use kdf::{derive_key, KdfParams, SessionKey, SESSION_KEY_LEN};
