//! HTTP client for the external OTP gateway
//!
//! The gateway delivers passcodes (WhatsApp message or email) and checks
//! submitted codes. Each call is a single attempt; dispatch and verify
//! failures surface as distinct upstream errors so the request layer can
//! report 502 instead of an auth failure.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::otp::{OtpChannel, OtpGateway};
use crate::domain::AuthError;

/// OTP gateway client configuration
#[derive(Debug, Clone)]
pub struct OtpGatewayConfig {
    /// Base URL of the gateway, e.g. `https://otp.example.com`
    pub base_url: String,
    /// Bearer token for the gateway API, if required
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    valid: bool,
}

/// Gateway client using reqwest
#[derive(Debug, Clone)]
pub struct HttpOtpGateway {
    client: reqwest::Client,
    config: OtpGatewayConfig,
}

impl HttpOtpGateway {
    pub fn new(config: OtpGatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut request = self.client.post(url);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait]
impl OtpGateway for HttpOtpGateway {
    async fn dispatch(
        &self,
        channel: OtpChannel,
        identifier: &str,
        display_name: &str,
    ) -> Result<(), AuthError> {
        debug!(%channel, "Dispatching OTP via gateway");

        let response = self
            .request(self.url("/otp/dispatch"))
            .json(&serde_json::json!({
                "channel": channel,
                "identifier": identifier,
                "display_name": display_name,
            }))
            .send()
            .await
            .map_err(|e| AuthError::dispatch(format!("gateway request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::dispatch(format!("gateway HTTP {status}: {body}")));
        }

        Ok(())
    }

    async fn verify(&self, identifier: &str, code: &str) -> Result<bool, AuthError> {
        debug!("Verifying OTP via gateway");

        let response = self
            .request(self.url("/otp/verify"))
            .json(&serde_json::json!({
                "identifier": identifier,
                "code": code,
            }))
            .send()
            .await
            .map_err(|e| AuthError::verify(format!("gateway request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::verify(format!("gateway HTTP {status}: {body}")));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AuthError::verify(format!("malformed gateway response: {e}")))?;

        Ok(body.valid)
    }
}
