//! Password-based key derivation (Argon2id).
//!
//! The session key depends only on the password and the process-wide salt,
//! so the same password always yields the same key regardless of how the
//! handshake went.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::Salt;
use crate::error::ConfigError;

/// Session key length in bytes.
pub const SESSION_KEY_LEN: usize = 32;

// Argon2id parameters: 1 pass, 64 MiB, 4 lanes
const ARGON2_T_COST: u32 = 1;
const ARGON2_M_COST: u32 = 64 * 1024; // KiB
const ARGON2_P_COST: u32 = 4;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Number of passes.
    pub t_cost: u32,
    /// Memory in KiB.
    pub m_cost: u32,
    /// Lanes.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            t_cost: ARGON2_T_COST,
            m_cost: ARGON2_M_COST,
            p_cost: ARGON2_P_COST,
        }
    }
}

impl KdfParams {
    fn to_argon2(self) -> Result<Params, ConfigError> {
        Params::new(self.m_cost, self.t_cost, self.p_cost, Some(SESSION_KEY_LEN))
            .map_err(|e| ConfigError::InvalidKdfParams(e.to_string()))
    }
}

/// Symmetric key for message content.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Derive the session key from the room password and the process-wide salt.
pub fn derive_key(password: &str, salt: &Salt, params: KdfParams) -> Result<SessionKey, ConfigError> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut output = [0u8; SESSION_KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut output)
        .map_err(|e| ConfigError::InvalidKdfParams(e.to_string()))?;

    let key = SessionKey::from_bytes(output);
    output.zeroize();
    Ok(key)
}

#[cfg(test)]
pub(crate) fn test_params() -> KdfParams {
    KdfParams {
        t_cost: 1,
        m_cost: 64,
        p_cost: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salt() -> Salt {
        Salt::new(b"0123456789abcdef0123456789abcdef".to_vec()).unwrap()
    }

    #[test]
    fn test_deterministic_with_default_params() {
        let key1 = derive_key("correct-horse", &salt(), KdfParams::default()).unwrap();
        let key2 = derive_key("correct-horse", &salt(), KdfParams::default()).unwrap();
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_different_passwords_differ() {
        let key1 = derive_key("right", &salt(), test_params()).unwrap();
        let key2 = derive_key("wrong", &salt(), test_params()).unwrap();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_different_salts_differ() {
        let other = Salt::new(b"fedcba9876543210fedcba9876543210".to_vec()).unwrap();
        let key1 = derive_key("pw", &salt(), test_params()).unwrap();
        let key2 = derive_key("pw", &other, test_params()).unwrap();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = KdfParams {
            t_cost: 0,
            m_cost: 64,
            p_cost: 1,
        };
        assert!(matches!(
            derive_key("pw", &salt(), params),
            Err(ConfigError::InvalidKdfParams(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SessionKey::from_bytes([7u8; SESSION_KEY_LEN]);
        assert_eq!(format!("{:?}", key), "SessionKey(<redacted>)");
    }
}
