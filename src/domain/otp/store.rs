//! Challenge storage and the transactional auth store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::entity::{ChallengeId, OtpChallenge};
use crate::domain::account::MemberId;
use crate::domain::session::{NewSession, Session};
use crate::domain::AuthError;

/// Read access to OTP challenges
#[async_trait]
pub trait OtpChallengeRepository: Send + Sync + Debug {
    async fn get(&self, id: ChallengeId) -> Result<Option<OtpChallenge>, AuthError>;
}

/// Unit-of-work boundary for the two OTP transitions that must be atomic
///
/// The backing datastore serializes conflicting writes; no in-process
/// locking beyond these two operations is needed. In-memory backends hold a
/// single write lock across each operation, the Postgres backend runs each
/// inside one transaction.
#[async_trait]
pub trait AuthStore: Send + Sync + Debug {
    /// Mark every pending challenge for this (member, identifier) pair as
    /// superseded, then insert a fresh pending challenge. After this returns,
    /// at most one challenge for the pair is pending.
    async fn issue_challenge(
        &self,
        member_id: MemberId,
        identifier: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, AuthError>;

    /// Consume the challenge if it is still unconsumed and insert the
    /// session in the same transaction. Returns `None` when a concurrent
    /// verify got there first (zero rows consumed). A session-insert failure
    /// rolls the consumption back, so the challenge stays pending.
    async fn consume_and_create_session(
        &self,
        challenge_id: ChallengeId,
        consumed_at: DateTime<Utc>,
        session: NewSession,
    ) -> Result<Option<Session>, AuthError>;
}
