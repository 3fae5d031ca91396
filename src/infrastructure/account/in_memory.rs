//! In-memory account/member repository

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::account::{
    Account, AccountId, AccountRepository, Member, MemberId, MemberWithAccount,
};
use crate::domain::AuthError;

/// In-memory implementation of AccountRepository
///
/// Accounts and members are provisioned externally, so this repository is
/// populated up front and read-only afterwards.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
    members: Arc<RwLock<HashMap<MemberId, Member>>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository seeded with provisioned accounts and members
    pub fn with_data(accounts: Vec<Account>, members: Vec<Member>) -> Self {
        let accounts_map = accounts.into_iter().map(|a| (a.id, a)).collect();
        let members_map = members.into_iter().map(|m| (m.id, m)).collect();

        Self {
            accounts: Arc::new(RwLock::new(accounts_map)),
            members: Arc::new(RwLock::new(members_map)),
        }
    }

    async fn find_members<F>(&self, matches: F) -> Result<Vec<MemberWithAccount>, AuthError>
    where
        F: Fn(&Member, &Account) -> bool,
    {
        let accounts = self.accounts.read().await;
        let members = self.members.read().await;

        let mut result: Vec<MemberWithAccount> = members
            .values()
            .filter_map(|m| {
                let account = accounts.get(&m.account_id)?;
                if account.is_active && matches(m, account) {
                    Some(MemberWithAccount {
                        member: m.clone(),
                        account: account.clone(),
                    })
                } else {
                    None
                }
            })
            .collect();

        // Deterministic verification order for the password path
        result.sort_by_key(|c| (c.account.id, c.member.id));

        Ok(result)
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, AuthError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn get_member(&self, id: MemberId) -> Result<Option<Member>, AuthError> {
        let members = self.members.read().await;
        Ok(members.get(&id).cloned())
    }

    async fn find_members_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError> {
        self.find_members(|m, _| m.phone == phone).await
    }

    async fn find_members_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError> {
        self.find_members(|m, _| {
            m.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
        .await
    }

    async fn find_members_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError> {
        self.find_members(|_, a| a.username == username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::StoredPassword;
    use chrono::Utc;

    fn account(id: AccountId, team_no: Option<u32>, username: &str, active: bool) -> Account {
        let now = Utc::now();
        Account {
            id,
            team_no,
            username: username.to_string(),
            email: None,
            phone: None,
            password: StoredPassword {
                salt_b64: String::new(),
                hash_b64: String::new(),
                iterations: 1,
            },
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    fn member(id: MemberId, account_id: AccountId, phone: &str, email: Option<&str>) -> Member {
        let now = Utc::now();
        Member {
            id,
            account_id,
            name: format!("Member {id}"),
            email: email.map(str::to_string),
            phone: phone.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn repo() -> InMemoryAccountRepository {
        InMemoryAccountRepository::with_data(
            vec![
                account(1, Some(7), "Team 7", true),
                account(2, Some(3), "Team 3", true),
                account(3, None, "Inactive", false),
            ],
            vec![
                member(10, 1, "9876543210", Some("alice@example.com")),
                member(11, 2, "9876543210", Some("bob@example.com")),
                member(12, 3, "9876543210", Some("alice@example.com")),
                member(13, 1, "5550001111", None),
            ],
        )
    }

    #[tokio::test]
    async fn test_find_by_phone_skips_inactive_accounts() {
        let repo = repo();

        let found = repo.find_members_by_phone("9876543210").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.account.is_active));
    }

    #[tokio::test]
    async fn test_find_by_phone_sorted_by_account_id() {
        let repo = repo();

        let found = repo.find_members_by_phone("9876543210").await.unwrap();
        assert_eq!(found[0].account.id, 1);
        assert_eq!(found[1].account.id, 2);
    }

    #[tokio::test]
    async fn test_find_by_email_case_insensitive() {
        let repo = repo();

        let found = repo
            .find_members_by_email("ALICE@Example.COM")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].member.id, 10);
    }

    #[tokio::test]
    async fn test_find_unknown_identifier_is_empty() {
        let repo = repo();

        assert!(repo.find_members_by_phone("0000000000").await.unwrap().is_empty());
        assert!(repo
            .find_members_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_find_by_username_exact_match() {
        let repo = repo();

        let found = repo.find_members_by_username("Team 7").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.account.id == 1));

        assert!(repo.find_members_by_username("team 7").await.unwrap().is_empty());
        assert!(repo.find_members_by_username("Inactive").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_account_and_member() {
        let repo = repo();

        assert!(repo.get_account(1).await.unwrap().is_some());
        assert!(repo.get_account(99).await.unwrap().is_none());
        assert!(repo.get_member(13).await.unwrap().is_some());
        assert!(repo.get_member(99).await.unwrap().is_none());
    }
}
