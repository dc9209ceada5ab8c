//! Session model and related functionality

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session entity
///
/// Only the SHA-256 hash of the issued token is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub account_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub remember_me: bool,
    pub is_active: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before expiry; negative once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

/// New session creation payload
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token_hash: String,
    pub remember_me: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    pub fn into_session(self) -> Session {
        Session {
            id: self.id,
            account_id: self.account_id,
            token_hash: self.token_hash,
            remember_me: self.remember_me,
            is_active: true,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: self.created_at,
            expires_at: self.expires_at,
            last_activity: self.created_at,
        }
    }
}
