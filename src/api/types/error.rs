//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::otp::OtpChannel;
use crate::domain::{AuthError, TeamChoice};

/// Error categories exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    AuthenticationError,
    NotFoundError,
    ConflictError,
    UpstreamError,
    ServerError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::AuthenticationError => write!(f, "authentication_error"),
            Self::NotFoundError => write!(f, "not_found_error"),
            Self::ConflictError => write!(f, "conflict_error"),
            Self::UpstreamError => write!(f, "upstream_error"),
            Self::ServerError => write!(f, "server_error"),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    /// Team choices accompanying an ambiguous-identifier conflict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamChoice>>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    teams: None,
                },
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ApiErrorType::AuthenticationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiErrorType::NotFoundError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ApiErrorType::ConflictError, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, ApiErrorType::UpstreamError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorType::ServerError, message)
    }

    pub fn with_teams(mut self, teams: Vec<TeamChoice>) -> Self {
        self.response.error.teams = Some(teams);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation { message } => Self::bad_request(message),
            AuthError::InvalidCredentials | AuthError::InvalidOtp => {
                Self::unauthorized(err.to_string())
            }
            AuthError::NotRegistered { channel } => Self::not_found(match channel {
                OtpChannel::Whatsapp => "Mobile number not registered.",
                OtpChannel::Email => "Email id not registered.",
            }),
            AuthError::AmbiguousIdentifier { channel, teams } => Self::conflict(format!(
                "Multiple team accounts found for this {}. Please select team number.",
                channel.identifier_label()
            ))
            .with_teams(teams),
            AuthError::Dispatch { message } | AuthError::Verify { message } => {
                Self::bad_gateway(message)
            }
            AuthError::Conflict { message }
            | AuthError::Storage { message }
            | AuthError::Internal { message } => Self::internal(message),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.error.error_type, self.response.error.message
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::validation("x"), StatusCode::BAD_REQUEST),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidOtp, StatusCode::UNAUTHORIZED),
            (
                AuthError::NotRegistered {
                    channel: OtpChannel::Whatsapp,
                },
                StatusCode::NOT_FOUND,
            ),
            (AuthError::dispatch("x"), StatusCode::BAD_GATEWAY),
            (AuthError::verify("x"), StatusCode::BAD_GATEWAY),
            (AuthError::storage("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, status);
        }
    }

    #[test]
    fn test_not_registered_message_names_channel() {
        let api: ApiError = AuthError::NotRegistered {
            channel: OtpChannel::Email,
        }
        .into();
        assert_eq!(api.response.error.message, "Email id not registered.");
    }

    #[test]
    fn test_ambiguous_identifier_carries_teams() {
        let api: ApiError = AuthError::AmbiguousIdentifier {
            channel: OtpChannel::Whatsapp,
            teams: vec![TeamChoice {
                team_no: Some(3),
                username: "Team 3".to_string(),
            }],
        }
        .into();

        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.response.error.message.contains("mobile number"));

        let json = serde_json::to_string(&api.response).unwrap();
        assert!(json.contains("\"teams\""));
        assert!(json.contains("\"Team 3\""));
    }

    #[test]
    fn test_teams_omitted_when_absent() {
        let api = ApiError::unauthorized("Invalid username or password.");
        let json = serde_json::to_string(&api.response).unwrap();
        assert!(!json.contains("teams"));
    }
}
