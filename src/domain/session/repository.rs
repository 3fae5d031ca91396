//! Session repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::entity::{NewSession, Session, SessionId};
use crate::domain::AuthError;

/// Persisted session storage
#[async_trait]
pub trait SessionRepository: Send + Sync + Debug {
    /// Insert a new session. Fails with `AuthError::Conflict` when the token
    /// fingerprint collides; the caller regenerates the token and retries.
    async fn create(&self, session: NewSession) -> Result<Session, AuthError>;

    /// Look up by token fingerprint, filtered to unrevoked and unexpired.
    /// Unknown, expired and revoked tokens are indistinguishable (`None`).
    async fn find_valid_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError>;

    /// Set `revoked_at` if unset. Revoking an already-revoked or unknown
    /// session is a no-op success.
    async fn revoke(&self, id: SessionId, now: DateTime<Utc>) -> Result<(), AuthError>;
}
