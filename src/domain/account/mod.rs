//! Accounts and members (read-only collaborators of the auth core)

mod entity;
mod repository;

pub use entity::{
    normalize_phone, Account, AccountId, LoginIdentifier, Member, MemberId, StoredPassword,
};
pub use repository::{AccountRepository, MemberWithAccount};
