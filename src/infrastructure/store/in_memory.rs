//! In-memory session and OTP challenge store
//!
//! Sessions and challenges live behind a single lock so the two composite
//! OTP transitions (supersede+insert, consume+session-create) are atomic
//! with respect to every other reader and writer, mirroring what the
//! Postgres backend gets from transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::account::MemberId;
use crate::domain::otp::{AuthStore, ChallengeId, OtpChallenge, OtpChallengeRepository};
use crate::domain::session::{NewSession, Session, SessionId, SessionRepository};
use crate::domain::AuthError;

#[derive(Debug, Default)]
struct StoreState {
    sessions: HashMap<SessionId, Session>,
    /// token_hash -> session id
    token_index: HashMap<String, SessionId>,
    challenges: HashMap<ChallengeId, OtpChallenge>,
    next_session_id: SessionId,
    next_challenge_id: ChallengeId,
}

impl StoreState {
    fn insert_session(&mut self, session: NewSession) -> Result<Session, AuthError> {
        if self.token_index.contains_key(&session.token_hash) {
            return Err(AuthError::conflict("Session token fingerprint collides"));
        }

        self.next_session_id += 1;
        let session = Session {
            id: self.next_session_id,
            account_id: session.account_id,
            member_id: session.member_id,
            token_hash: session.token_hash,
            created_at: session.created_at,
            expires_at: session.expires_at,
            revoked_at: None,
        };

        self.token_index
            .insert(session.token_hash.clone(), session.id);
        self.sessions.insert(session.id, session.clone());

        Ok(session)
    }
}

/// In-memory implementation of the session store, challenge store and the
/// transactional auth store
#[derive(Debug, Default)]
pub struct InMemoryAuthStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending challenges for one (member, identifier) pair
    #[cfg(test)]
    pub async fn pending_count(&self, member_id: MemberId, identifier: &str) -> usize {
        let state = self.state.read().await;
        state
            .challenges
            .values()
            .filter(|c| {
                c.member_id == Some(member_id)
                    && c.identifier == identifier
                    && c.consumed_at.is_none()
            })
            .count()
    }
}

#[async_trait]
impl SessionRepository for InMemoryAuthStore {
    async fn create(&self, session: NewSession) -> Result<Session, AuthError> {
        let mut state = self.state.write().await;
        state.insert_session(session)
    }

    async fn find_valid_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError> {
        let state = self.state.read().await;

        let session = state
            .token_index
            .get(token_hash)
            .and_then(|id| state.sessions.get(id))
            .filter(|s| s.is_valid(now))
            .cloned();

        Ok(session)
    }

    async fn revoke(&self, id: SessionId, now: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.write().await;

        if let Some(session) = state.sessions.get_mut(&id) {
            if session.revoked_at.is_none() {
                session.revoked_at = Some(now);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl OtpChallengeRepository for InMemoryAuthStore {
    async fn get(&self, id: ChallengeId) -> Result<Option<OtpChallenge>, AuthError> {
        let state = self.state.read().await;
        Ok(state.challenges.get(&id).cloned())
    }
}

#[async_trait]
impl AuthStore for InMemoryAuthStore {
    async fn issue_challenge(
        &self,
        member_id: MemberId,
        identifier: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, AuthError> {
        let mut state = self.state.write().await;

        // Supersede whatever is still pending for this pair
        for challenge in state.challenges.values_mut() {
            if challenge.member_id == Some(member_id)
                && challenge.identifier == identifier
                && challenge.consumed_at.is_none()
                && challenge.expires_at > created_at
            {
                challenge.consumed_at = Some(created_at);
            }
        }

        state.next_challenge_id += 1;
        let challenge = OtpChallenge {
            id: state.next_challenge_id,
            identifier: identifier.to_string(),
            member_id: Some(member_id),
            created_at,
            expires_at,
            consumed_at: None,
        };
        state.challenges.insert(challenge.id, challenge.clone());

        Ok(challenge)
    }

    async fn consume_and_create_session(
        &self,
        challenge_id: ChallengeId,
        consumed_at: DateTime<Utc>,
        session: NewSession,
    ) -> Result<Option<Session>, AuthError> {
        let mut state = self.state.write().await;

        // Conditional consume: exactly one caller wins
        match state.challenges.get_mut(&challenge_id) {
            Some(challenge) if challenge.consumed_at.is_none() => {
                challenge.consumed_at = Some(consumed_at);
            }
            _ => return Ok(None),
        }

        match state.insert_session(session) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // Roll the consumption back so the challenge stays pending
                if let Some(challenge) = state.challenges.get_mut(&challenge_id) {
                    challenge.consumed_at = None;
                }
                Err(e)
            }
        }
    }
}
