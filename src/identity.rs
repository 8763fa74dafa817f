//! Local user identity.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::protocol::PresenceStatus;

/// Length of generated user ids.
pub const USER_ID_LEN: usize = 8;

/// Identity of this client, generated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    status: PresenceStatus,
    timestamp: i64,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        let user_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(USER_ID_LEN)
            .map(char::from)
            .collect();
        Self::with_user_id(user_id)
    }

    /// Identity with a fixed user id.
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            status: PresenceStatus::Connected,
            timestamp: unix_now(),
        }
    }

    /// The user id shown to other room members.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Presence status announced on join.
    pub fn status(&self) -> PresenceStatus {
        self.status
    }

    /// Creation time, Unix seconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        let identity = Identity::generate();
        assert_eq!(identity.user_id().len(), USER_ID_LEN);
        assert!(identity.user_id().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(identity.status(), PresenceStatus::Connected);
        assert!(identity.timestamp() > 0);
    }

    #[test]
    fn test_ids_are_random() {
        assert_ne!(Identity::generate().user_id(), Identity::generate().user_id());
    }
}
