//! Session entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::account::{AccountId, MemberId};

pub type SessionId = i64;

/// A live login grant
///
/// Only the token fingerprint is stored; the raw token is returned to the
/// caller once at issuance and never persisted. Sessions are never hard
/// deleted: logout sets `revoked_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub account_id: AccountId,
    pub member_id: Option<MemberId>,
    /// Hex SHA-256 of the raw bearer token, unique
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Valid iff unrevoked and unexpired
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Fields for a session about to be inserted
#[derive(Debug, Clone)]
pub struct NewSession {
    pub account_id: AccountId,
    pub member_id: Option<MemberId>,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
