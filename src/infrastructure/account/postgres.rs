//! PostgreSQL account/member repository

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::account::{
    Account, AccountId, AccountRepository, Member, MemberId, MemberWithAccount, StoredPassword,
};
use crate::domain::AuthError;

const MEMBER_WITH_ACCOUNT_COLUMNS: &str = r#"
    m.id AS member_id, m.account_id, m.name, m.email AS member_email,
    m.phone AS member_phone, m.created_at AS member_created_at,
    m.updated_at AS member_updated_at,
    a.id AS account_id_a, a.team_no, a.username, a.email AS account_email,
    a.phone AS account_phone, a.password_salt_b64, a.password_hash_b64,
    a.password_iterations, a.is_active, a.created_at AS account_created_at,
    a.updated_at AS account_updated_at
"#;

/// PostgreSQL implementation of AccountRepository
#[derive(Debug, Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_members_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError> {
        let query = format!(
            r#"
            SELECT {MEMBER_WITH_ACCOUNT_COLUMNS}
            FROM members m
            JOIN accounts a ON a.id = m.account_id
            WHERE {predicate} AND a.is_active
            ORDER BY a.id, m.id
            "#
        );

        let rows = sqlx::query(&query)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuthError::storage(format!("Failed to find members: {e}")))?;

        rows.iter().map(row_to_member_with_account).collect()
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, team_no, username, email, phone, password_salt_b64,
                   password_hash_b64, password_iterations, is_active,
                   created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::storage(format!("Failed to get account: {e}")))?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn get_member(&self, id: MemberId) -> Result<Option<Member>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, name, email, phone, created_at, updated_at
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::storage(format!("Failed to get member: {e}")))?;

        Ok(row.map(|row| Member {
            id: row.get("id"),
            account_id: row.get("account_id"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn find_members_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError> {
        self.find_members_where("m.phone = $1", phone).await
    }

    async fn find_members_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError> {
        self.find_members_where("LOWER(m.email) = LOWER($1)", email)
            .await
    }

    async fn find_members_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError> {
        self.find_members_where("a.username = $1", username).await
    }
}

fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<Account, AuthError> {
    let team_no: Option<i32> = row.get("team_no");
    let iterations: i32 = row.get("password_iterations");

    Ok(Account {
        id: row.get("id"),
        team_no: team_no.map(|n| n as u32),
        username: row.get("username"),
        email: row.get("email"),
        phone: row.get("phone"),
        password: StoredPassword {
            salt_b64: row.get("password_salt_b64"),
            hash_b64: row.get("password_hash_b64"),
            iterations: iterations as u32,
        },
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_member_with_account(row: &sqlx::postgres::PgRow) -> Result<MemberWithAccount, AuthError> {
    let team_no: Option<i32> = row.get("team_no");
    let iterations: i32 = row.get("password_iterations");

    Ok(MemberWithAccount {
        member: Member {
            id: row.get("member_id"),
            account_id: row.get("account_id"),
            name: row.get("name"),
            email: row.get("member_email"),
            phone: row.get("member_phone"),
            created_at: row.get("member_created_at"),
            updated_at: row.get("member_updated_at"),
        },
        account: Account {
            id: row.get("account_id_a"),
            team_no: team_no.map(|n| n as u32),
            username: row.get("username"),
            email: row.get("account_email"),
            phone: row.get("account_phone"),
            password: StoredPassword {
                salt_b64: row.get("password_salt_b64"),
                hash_b64: row.get("password_hash_b64"),
                iterations: iterations as u32,
            },
            is_active: row.get("is_active"),
            created_at: row.get("account_created_at"),
            updated_at: row.get("account_updated_at"),
        },
    })
}
