//! PostgreSQL session and OTP challenge store
//!
//! The composite OTP transitions each run inside one database transaction;
//! the database's write serialization is the only concurrency control.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::domain::account::MemberId;
use crate::domain::otp::{AuthStore, ChallengeId, OtpChallenge, OtpChallengeRepository};
use crate::domain::session::{NewSession, Session, SessionId, SessionRepository};
use crate::domain::AuthError;

/// PostgreSQL implementation of the session store, challenge store and the
/// transactional auth store
#[derive(Debug, Clone)]
pub struct PostgresAuthStore {
    pool: PgPool,
}

impl PostgresAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_session(
        tx: &mut Transaction<'_, Postgres>,
        session: &NewSession,
    ) -> Result<Session, AuthError> {
        let id: SessionId = sqlx::query_scalar(
            r#"
            INSERT INTO sessions (account_id, member_id, token_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(session.account_id)
        .bind(session.member_id)
        .bind(&session.token_hash)
        .bind(session.created_at)
        .bind(session.expires_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                AuthError::conflict("Session token fingerprint collides")
            } else {
                AuthError::storage(format!("Failed to create session: {e}"))
            }
        })?;

        Ok(Session {
            id,
            account_id: session.account_id,
            member_id: session.member_id,
            token_hash: session.token_hash.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
            revoked_at: None,
        })
    }
}

#[async_trait]
impl SessionRepository for PostgresAuthStore {
    async fn create(&self, session: NewSession) -> Result<Session, AuthError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::storage(format!("Failed to begin transaction: {e}")))?;

        let created = Self::insert_session(&mut tx, &session).await?;

        tx.commit()
            .await
            .map_err(|e| AuthError::storage(format!("Failed to commit: {e}")))?;

        Ok(created)
    }

    async fn find_valid_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, member_id, token_hash, created_at, expires_at, revoked_at
            FROM sessions
            WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::storage(format!("Failed to look up session: {e}")))?;

        Ok(row.map(|row| Session {
            id: row.get("id"),
            account_id: row.get("account_id"),
            member_id: row.get("member_id"),
            token_hash: row.get("token_hash"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
            revoked_at: row.get("revoked_at"),
        }))
    }

    async fn revoke(&self, id: SessionId, now: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query("UPDATE sessions SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::storage(format!("Failed to revoke session: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl OtpChallengeRepository for PostgresAuthStore {
    async fn get(&self, id: ChallengeId) -> Result<Option<OtpChallenge>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, identifier, member_id, created_at, expires_at, consumed_at
            FROM otp_challenges
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::storage(format!("Failed to get challenge: {e}")))?;

        Ok(row.map(|row| OtpChallenge {
            id: row.get("id"),
            identifier: row.get("identifier"),
            member_id: row.get("member_id"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
            consumed_at: row.get("consumed_at"),
        }))
    }
}

#[async_trait]
impl AuthStore for PostgresAuthStore {
    async fn issue_challenge(
        &self,
        member_id: MemberId,
        identifier: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, AuthError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::storage(format!("Failed to begin transaction: {e}")))?;

        sqlx::query(
            r#"
            UPDATE otp_challenges
            SET consumed_at = $3
            WHERE member_id = $1 AND identifier = $2
              AND consumed_at IS NULL AND expires_at > $3
            "#,
        )
        .bind(member_id)
        .bind(identifier)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AuthError::storage(format!("Failed to supersede challenges: {e}")))?;

        let id: ChallengeId = sqlx::query_scalar(
            r#"
            INSERT INTO otp_challenges (identifier, member_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(identifier)
        .bind(member_id)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AuthError::storage(format!("Failed to insert challenge: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AuthError::storage(format!("Failed to commit: {e}")))?;

        Ok(OtpChallenge {
            id,
            identifier: identifier.to_string(),
            member_id: Some(member_id),
            created_at,
            expires_at,
            consumed_at: None,
        })
    }

    async fn consume_and_create_session(
        &self,
        challenge_id: ChallengeId,
        consumed_at: DateTime<Utc>,
        session: NewSession,
    ) -> Result<Option<Session>, AuthError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::storage(format!("Failed to begin transaction: {e}")))?;

        let consumed = sqlx::query(
            "UPDATE otp_challenges SET consumed_at = $2 WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(challenge_id)
        .bind(consumed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AuthError::storage(format!("Failed to consume challenge: {e}")))?;

        // Zero rows means a concurrent verify already consumed it
        if consumed.rows_affected() != 1 {
            tx.rollback()
                .await
                .map_err(|e| AuthError::storage(format!("Failed to roll back: {e}")))?;
            return Ok(None);
        }

        // Session insert shares the transaction; a failure here rolls the
        // consumption back when `tx` drops.
        let created = Self::insert_session(&mut tx, &session).await?;

        tx.commit()
            .await
            .map_err(|e| AuthError::storage(format!("Failed to commit: {e}")))?;

        Ok(Some(created))
    }
}
