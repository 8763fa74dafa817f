//! Authenticated encryption of message content.
//!
//! ChaCha20-Poly1305 with a fresh random nonce per call.
//! Output format: nonce (12 bytes) || ciphertext (includes 16-byte tag).

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use super::kdf::SessionKey;
use crate::error::{DecryptError, EncryptError};

/// Nonce size for ChaCha20Poly1305.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size.
pub const TAG_SIZE: usize = 16;

/// Encrypt `plaintext` under `key`.
pub fn encrypt(plaintext: &[u8], key: &SessionKey) -> Result<Vec<u8>, EncryptError> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| EncryptError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt data produced by [`encrypt`].
///
/// Every failure collapses into [`DecryptError::AuthenticationFailed`].
pub fn decrypt(data: &[u8], key: &SessionKey) -> Result<Vec<u8>, DecryptError> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(DecryptError::AuthenticationFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| DecryptError::AuthenticationFailed)
}

/// Encrypt a chat line. The plaintext is the JSON encoding of the text.
pub fn seal_text(text: &str, key: &SessionKey) -> Result<Vec<u8>, EncryptError> {
    let encoded = serde_json::Value::String(text.to_string()).to_string();
    encrypt(encoded.as_bytes(), key)
}

/// Decrypt a chat line sealed with [`seal_text`].
///
/// Payloads that are not a JSON string are shown as lossy UTF-8.
pub fn open_text(data: &[u8], key: &SessionKey) -> Result<String, DecryptError> {
    let plaintext = decrypt(data, key)?;
    match serde_json::from_slice::<String>(&plaintext) {
        Ok(text) => Ok(text),
        Err(_) => Ok(String::from_utf8_lossy(&plaintext).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SESSION_KEY_LEN;
    use crate::error::ChatError;

    fn key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; SESSION_KEY_LEN])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"Hello, room!";
        let encrypted = encrypt(plaintext, &key(1)).unwrap();
        let decrypted = decrypt(&encrypted, &key(1)).unwrap();
        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = encrypt(b"secret", &key(1)).unwrap();
        assert_eq!(
            decrypt(&encrypted, &key(2)),
            Err(DecryptError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut encrypted = encrypt(b"secret", &key(1)).unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert_eq!(
            decrypt(&encrypted, &key(1)),
            Err(DecryptError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_truncated_input_is_indistinguishable() {
        assert_eq!(
            decrypt(&[0u8; 10], &key(1)),
            Err(DecryptError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let a = encrypt(b"same", &key(1)).unwrap();
        let b = encrypt(b"same", &key(1)).unwrap();
        assert_ne!(a, b);
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
    }

    #[test]
    fn test_encrypt_failure_is_reported() {
        let err = ChatError::from(EncryptError::EncryptionFailed("aead::Error".into()));
        assert_eq!(err.to_string(), "Encryption failed: aead::Error");
    }

    #[test]
    fn test_empty_plaintext() {
        let encrypted = encrypt(b"", &key(3)).unwrap();
        assert_eq!(encrypted.len(), NONCE_SIZE + TAG_SIZE);
        assert!(decrypt(&encrypted, &key(3)).unwrap().is_empty());
    }

    #[test]
    fn test_text_is_json_encoded() {
        let sealed = seal_text("hi \"there\"", &key(4)).unwrap();
        let raw = decrypt(&sealed, &key(4)).unwrap();
        assert_eq!(raw, br#""hi \"there\"""#.to_vec());
        assert_eq!(open_text(&sealed, &key(4)).unwrap(), "hi \"there\"");
    }

    #[test]
    fn test_open_text_falls_back_to_raw_utf8() {
        let sealed = encrypt(b"plain words", &key(5)).unwrap();
        assert_eq!(open_text(&sealed, &key(5)).unwrap(), "plain words");
    }
}
