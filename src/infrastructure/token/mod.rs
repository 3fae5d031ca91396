//! Session token generation
//!
//! Generates cryptographically random bearer tokens and the one-way
//! fingerprint used as their storage key. Raw tokens leave this module
//! exactly once and are never persisted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// Codec for raw session tokens and their persisted fingerprints
#[derive(Debug, Clone, Default)]
pub struct SessionTokenCodec;

impl SessionTokenCodec {
    pub fn new() -> Self {
        Self
    }

    /// Generate a new URL-safe random token
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Deterministic one-way fingerprint of a raw token, hex encoded. This
    /// is the only form that is persisted or used for lookup.
    pub fn fingerprint(&self, raw_token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Session lifetime policy
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    lifetime: Duration,
}

impl SessionPolicy {
    pub fn new(lifetime: Duration) -> Self {
        Self { lifetime }
    }

    pub fn from_hours(hours: i64) -> Self {
        Self::new(Duration::hours(hours))
    }

    /// Issuance timestamps computed from "now"
    pub fn session_times(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now, now + self.lifetime)
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_hours(12)
    }
}
