//! Account/member repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{Account, AccountId, Member, MemberId};
use crate::domain::AuthError;

/// A member together with its owning account, as resolved for login or OTP
/// identifier matching.
#[derive(Debug, Clone)]
pub struct MemberWithAccount {
    pub member: Member,
    pub account: Account,
}

/// Read-only access to accounts and members
///
/// Candidate lookups return only members of active accounts, sorted by
/// ascending account id so password verification order is deterministic.
#[async_trait]
pub trait AccountRepository: Send + Sync + Debug {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, AuthError>;

    async fn get_member(&self, id: MemberId) -> Result<Option<Member>, AuthError>;

    /// Members of active accounts with exactly this normalized phone
    async fn find_members_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError>;

    /// Members of active accounts whose email matches case-insensitively
    async fn find_members_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError>;

    /// Members of the active account registered under exactly this name
    async fn find_members_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<MemberWithAccount>, AuthError>;
}
