//! OTP challenge entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::account::MemberId;

pub type ChallengeId = i64;

/// Delivery channel for one-time passcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Whatsapp,
    Email,
}

impl OtpChannel {
    /// Label used in user-facing messages
    pub fn identifier_label(&self) -> &'static str {
        match self {
            Self::Whatsapp => "mobile number",
            Self::Email => "email id",
        }
    }
}

impl std::fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whatsapp => write!(f, "whatsapp"),
            Self::Email => write!(f, "email"),
        }
    }
}

/// One OTP attempt, bound to a member and the identifier the code was sent to
///
/// Lifecycle per (member, identifier): Pending until consumed exactly once on
/// successful verification, superseded when a newer challenge is issued, or
/// expired (checked lazily, no sweeper). Superseding also sets `consumed_at`,
/// so "unconsumed" is the single pending-ness test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub id: ChallengeId,
    /// Normalized phone or email the code was dispatched to
    pub identifier: String,
    pub member_id: Option<MemberId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl OtpChallenge {
    /// Valid iff unconsumed and unexpired
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn challenge(now: DateTime<Utc>) -> OtpChallenge {
        OtpChallenge {
            id: 1,
            identifier: "9876543210".to_string(),
            member_id: Some(5),
            created_at: now,
            expires_at: now + Duration::minutes(5),
            consumed_at: None,
        }
    }

    #[test]
    fn test_pending_challenge_is_valid() {
        let now = Utc::now();
        assert!(challenge(now).is_valid(now));
    }

    #[test]
    fn test_expired_challenge_is_invalid() {
        let now = Utc::now();
        assert!(!challenge(now).is_valid(now + Duration::minutes(6)));
    }

    #[test]
    fn test_consumed_challenge_is_invalid() {
        let now = Utc::now();
        let mut ch = challenge(now);
        ch.consumed_at = Some(now);
        assert!(!ch.is_valid(now));
    }

    #[test]
    fn test_channel_labels() {
        assert_eq!(OtpChannel::Whatsapp.identifier_label(), "mobile number");
        assert_eq!(OtpChannel::Email.identifier_label(), "email id");
        assert_eq!(OtpChannel::Whatsapp.to_string(), "whatsapp");
    }
}
