//! Team registration auth service
//!
//! Authentication for a team registration app:
//! - Password login against PBKDF2-hashed account passwords
//! - OTP login over WhatsApp or email with exactly-once consumption
//! - Opaque bearer session tokens, stored only as SHA-256 fingerprints

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use domain::account::AccountRepository;
use domain::otp::{AuthStore, OtpChallengeRepository};
use domain::session::SessionRepository;
use domain::SystemClock;
use infrastructure::account::{InMemoryAccountRepository, PostgresAccountRepository};
use infrastructure::auth::{AuthService, AuthServiceDeps};
use infrastructure::gateway::{HttpOtpGateway, OtpGatewayConfig};
use infrastructure::password::Pbkdf2Hasher;
use infrastructure::store::{InMemoryAuthStore, PostgresAuthStore};
use infrastructure::token::SessionPolicy;

/// Create the application state with all services initialized
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let gateway = Arc::new(HttpOtpGateway::new(OtpGatewayConfig {
        base_url: config.gateway.base_url.clone(),
        api_token: config.gateway.api_token.clone(),
    }));
    let hasher = Arc::new(Pbkdf2Hasher::new(config.auth.pbkdf2_iterations));
    let session_policy = SessionPolicy::from_hours(config.auth.session_ttl_hours);

    info!("Storage backend: {}", config.storage.backend);

    let (accounts, sessions, challenges, store): (
        Arc<dyn AccountRepository>,
        Arc<dyn SessionRepository>,
        Arc<dyn OtpChallengeRepository>,
        Arc<dyn AuthStore>,
    ) = match config.storage.backend.as_str() {
        "postgres" => {
            let database_url = std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

            info!("Connecting to PostgreSQL...");
            let pg_pool = sqlx::PgPool::connect(&database_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to PostgreSQL: {}", e))?;
            info!("PostgreSQL connection established");

            let store = Arc::new(PostgresAuthStore::new(pg_pool.clone()));
            (
                Arc::new(PostgresAccountRepository::new(pg_pool)),
                store.clone(),
                store.clone(),
                store,
            )
        }
        _ => {
            // Accounts are provisioned externally, so the in-memory backend
            // starts empty and only suits development.
            let store = Arc::new(InMemoryAuthStore::new());
            (
                Arc::new(InMemoryAccountRepository::new()),
                store.clone(),
                store.clone(),
                store,
            )
        }
    };

    let auth_service = Arc::new(AuthService::new(AuthServiceDeps {
        accounts,
        sessions,
        challenges,
        store,
        gateway,
        hasher,
        clock: Arc::new(SystemClock),
        session_policy,
        otp_ttl: chrono::Duration::minutes(config.auth.otp_ttl_minutes),
    }));

    Ok(AppState::new(auth_service))
}
