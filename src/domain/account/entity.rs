//! Account and member entities
//!
//! Accounts (one per registered team) and their members are provisioned by
//! an external import process. The auth core only reads them: they anchor
//! sessions and OTP challenges but are never created or deleted here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AccountId = i64;
pub type MemberId = i64;

/// Persisted password material for one account
///
/// The iteration count is stored per record so hashes written under an older
/// default remain verifiable after the default is raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPassword {
    pub salt_b64: String,
    pub hash_b64: String,
    pub iterations: u32,
}

/// One registered team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Team number, unique when assigned
    pub team_no: Option<u32>,
    /// Display name, unique
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password: StoredPassword,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One person belonging to exactly one account
///
/// `(account_id, phone)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub account_id: AccountId,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Strip everything but digits from a phone number
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Login identifier resolved from user input: email when it contains '@',
/// otherwise a digits-only phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    Phone(String),
}

impl LoginIdentifier {
    /// Parse raw user input. Returns `None` when the input is empty or a
    /// phone number normalizes to nothing.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.contains('@') {
            return Some(Self::Email(raw.to_string()));
        }

        let phone = normalize_phone(raw);
        if phone.is_empty() {
            None
        } else {
            Some(Self::Phone(phone))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_strips_non_digits() {
        assert_eq!(normalize_phone("+91 98765-43210"), "919876543210");
        assert_eq!(normalize_phone("(987) 654 3210"), "9876543210");
        assert_eq!(normalize_phone("abc"), "");
    }

    #[test]
    fn test_parse_email_identifier() {
        let id = LoginIdentifier::parse("  Team7@Example.com ").unwrap();
        assert_eq!(id, LoginIdentifier::Email("Team7@Example.com".to_string()));
    }

    #[test]
    fn test_parse_phone_identifier() {
        let id = LoginIdentifier::parse("98765 43210").unwrap();
        assert_eq!(id, LoginIdentifier::Phone("9876543210".to_string()));
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert!(LoginIdentifier::parse("").is_none());
        assert!(LoginIdentifier::parse("   ").is_none());
        assert!(LoginIdentifier::parse("---").is_none());
    }
}
