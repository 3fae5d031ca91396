//! Authentication API endpoints
//!
//! Login with password or OTP, session logout and the current-user view.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{auth_header_value, RequireSession};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::account::{Account, AccountId, Member, MemberId};
use crate::domain::otp::{ChallengeId, OtpChannel};
use crate::infrastructure::auth::LoginGrant;

/// Create the authentication router
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/otp/request", post(request_otp))
        .route("/otp/verify", post(verify_otp))
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Successful login response (password or OTP path)
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
    pub member: MemberResponse,
}

/// Account fields safe to expose
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: AccountId,
    pub username: String,
    pub team_no: Option<u32>,
}

/// Member fields safe to expose
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: MemberId,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
}

impl UserResponse {
    fn from_account(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            team_no: account.team_no,
        }
    }
}

impl MemberResponse {
    fn from_member(member: &Member) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            email: member.email.clone(),
            phone: member.phone.clone(),
        }
    }
}

impl LoginResponse {
    fn from_grant(grant: &LoginGrant) -> Self {
        Self {
            token: grant.token.clone(),
            expires_at: grant.session.expires_at,
            user: UserResponse::from_account(&grant.account),
            member: MemberResponse::from_member(&grant.member),
        }
    }
}

/// Login with an identifier (team name, phone or email) and password
///
/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let grant = state
        .auth_service
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse::from_grant(&grant)))
}

/// OTP request body
///
/// `phone` is used on the whatsapp channel, `email` on the email channel.
#[derive(Debug, Deserialize)]
pub struct OtpRequestBody {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub team_no: Option<u32>,
}

/// OTP request response
#[derive(Debug, Serialize)]
pub struct OtpRequestResponse {
    pub challenge_id: ChallengeId,
    pub expires_at: DateTime<Utc>,
}

/// Request a one-time passcode
///
/// POST /api/otp/request
pub async fn request_otp(
    State(state): State<AppState>,
    Json(request): Json<OtpRequestBody>,
) -> Result<Json<OtpRequestResponse>, ApiError> {
    let channel = parse_channel(&request.channel)?;
    let identifier = match channel {
        OtpChannel::Whatsapp => request.phone.unwrap_or_default(),
        OtpChannel::Email => request.email.unwrap_or_default(),
    };

    let issued = state
        .auth_service
        .request_otp(channel, &identifier, request.team_no)
        .await?;

    Ok(Json(OtpRequestResponse {
        challenge_id: issued.challenge_id,
        expires_at: issued.expires_at,
    }))
}

/// OTP verification body
#[derive(Debug, Deserialize)]
pub struct OtpVerifyBody {
    pub challenge_id: ChallengeId,
    #[serde(default)]
    pub code: String,
}

/// Verify a passcode and log in
///
/// POST /api/otp/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<OtpVerifyBody>,
) -> Result<Json<LoginResponse>, ApiError> {
    let grant = state
        .auth_service
        .verify_otp(request.challenge_id, &request.code)
        .await?;

    Ok(Json(LoginResponse::from_grant(&grant)))
}

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Revoke the presented session token
///
/// POST /api/logout
///
/// Succeeds even without a live session, so logout is always safe to call.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    state
        .auth_service
        .logout(auth_header_value(&headers))
        .await?;

    Ok(Json(LogoutResponse {
        message: "Logged out.".to_string(),
    }))
}

/// Current user response
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberResponse>,
}

/// Get the account and member behind the presented session
///
/// GET /api/me
pub async fn get_current_user(
    RequireSession(authed): RequireSession,
) -> Result<Json<MeResponse>, ApiError> {
    Ok(Json(MeResponse {
        user: UserResponse::from_account(&authed.account),
        member: authed.member.as_ref().map(MemberResponse::from_member),
    }))
}

fn parse_channel(raw: &str) -> Result<OtpChannel, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "whatsapp" => Ok(OtpChannel::Whatsapp),
        "email" => Ok(OtpChannel::Email),
        _ => Err(ApiError::bad_request("Invalid OTP channel.")),
    }
}
