//! Bearer-session authentication middleware

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::auth::AuthenticatedSession;

/// Extractor that requires a live bearer session
///
/// The token comes from the `Authorization: Bearer <token>` header. Any
/// failure to resolve it to a live session rejects with 401.
#[derive(Debug, Clone)]
pub struct RequireSession(pub AuthenticatedSession);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        debug!("Validating bearer session");

        let authed = state
            .auth_service
            .authenticate_bearer(auth_header_value(&parts.headers))
            .await?
            .ok_or_else(|| {
                ApiError::unauthorized(
                    "Authentication required. Provide a session token via \
                     'Authorization: Bearer <token>' header",
                )
            })?;

        Ok(RequireSession(authed))
    }
}

/// The `Authorization` header as a string, if present and valid UTF-8
pub fn auth_header_value(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION)?.to_str().ok()
}
