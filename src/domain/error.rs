use thiserror::Error;

use super::otp::OtpChannel;

/// A team the caller may pick when an OTP identifier matches more than one
/// account. Sorted ascending by team number, accounts without a number last.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TeamChoice {
    pub team_no: Option<u32>,
    pub username: String,
}

/// Core authentication errors
///
/// `InvalidCredentials` and `InvalidOtp` deliberately carry no detail: the
/// caller must not be able to tell an unknown identifier from a wrong
/// password, or a consumed challenge from one that never existed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Invalid or expired OTP.")]
    InvalidOtp,

    #[error("{channel} identifier not registered")]
    NotRegistered { channel: OtpChannel },

    #[error("multiple team accounts found for this {channel} identifier")]
    AmbiguousIdentifier {
        channel: OtpChannel,
        teams: Vec<TeamChoice>,
    },

    #[error("OTP dispatch failed: {message}")]
    Dispatch { message: String },

    #[error("OTP verification failed: {message}")]
    Verify { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    pub fn verify(message: impl Into<String>) -> Self {
        Self::Verify {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Sort ambiguous-match candidates: team numbers ascending, accounts without
/// a team number last.
pub fn sort_team_choices(teams: &mut [TeamChoice]) {
    teams.sort_by_key(|t| (t.team_no.is_none(), t.team_no.unwrap_or(0)));
}
