//! Password hashing using PBKDF2-HMAC-SHA256
//!
//! Each record carries its own salt and iteration count, so raising the
//! default cost never invalidates existing hashes.

use base64::{engine::general_purpose::STANDARD, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::fmt::Debug;

use crate::domain::account::StoredPassword;
use crate::domain::AuthError;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Trait for password hashing operations
pub trait PasswordHasher: Send + Sync + Debug {
    /// Derive a fresh salted hash for a password
    fn hash(&self, password: &str) -> Result<StoredPassword, AuthError>;

    /// Verify a password against a stored record. Returns false on mismatch
    /// or any malformed stored value; never errors.
    fn verify(&self, password: &str, stored: &StoredPassword) -> bool;
}

/// PBKDF2-based password hasher
#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    iterations: u32,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
        key
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        // Matches the default persisted with provisioned accounts
        Self::new(600_000)
    }
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, password: &str) -> Result<StoredPassword, AuthError> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let key = Self::derive(password, &salt, self.iterations);

        Ok(StoredPassword {
            salt_b64: STANDARD.encode(salt),
            hash_b64: STANDARD.encode(key),
            iterations: self.iterations,
        })
    }

    fn verify(&self, password: &str, stored: &StoredPassword) -> bool {
        let salt = match STANDARD.decode(&stored.salt_b64) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let expected = match STANDARD.decode(&stored.hash_b64) {
            Ok(h) => h,
            Err(_) => return false,
        };
        if stored.iterations == 0 {
            return false;
        }

        let key = Self::derive(password, &salt, stored.iterations);
        constant_time_compare(&key, &expected)
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;

    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keep tests fast; the cost parameter is orthogonal to correctness
    fn hasher() -> Pbkdf2Hasher {
        Pbkdf2Hasher::new(1_000)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let stored = hasher.hash("Team@007").unwrap();

        assert!(hasher.verify("Team@007", &stored));
        assert!(!hasher.verify("wrong", &stored));
    }

    #[test]
    fn test_hash_is_unique_per_call() {
        let hasher = hasher();
        let a = hasher.hash("Team@007").unwrap();
        let b = hasher.hash("Team@007").unwrap();

        // Fresh random salt every call
        assert_ne!(a.salt_b64, b.salt_b64);
        assert_ne!(a.hash_b64, b.hash_b64);
        assert!(hasher.verify("Team@007", &a));
        assert!(hasher.verify("Team@007", &b));
    }

    #[test]
    fn test_verify_survives_iteration_bump() {
        let old = Pbkdf2Hasher::new(1_000);
        let stored = old.hash("Team@007").unwrap();

        // A hasher with a higher default still verifies old records because
        // the iteration count travels with the record.
        let new = Pbkdf2Hasher::new(2_000);
        assert!(new.verify("Team@007", &stored));
    }

    #[test]
    fn test_verify_mutated_salt_fails() {
        let hasher = hasher();
        let mut stored = hasher.hash("Team@007").unwrap();
        stored.salt_b64 = STANDARD.encode([0u8; SALT_LEN]);

        assert!(!hasher.verify("Team@007", &stored));
    }

    #[test]
    fn test_verify_mutated_hash_fails() {
        let hasher = hasher();
        let mut stored = hasher.hash("Team@007").unwrap();
        let mut raw = STANDARD.decode(&stored.hash_b64).unwrap();
        raw[0] ^= 0x01;
        stored.hash_b64 = STANDARD.encode(raw);

        assert!(!hasher.verify("Team@007", &stored));
    }

    #[test]
    fn test_verify_malformed_record_returns_false() {
        let hasher = hasher();
        let stored = StoredPassword {
            salt_b64: "not base64 !!".to_string(),
            hash_b64: "also not base64 !!".to_string(),
            iterations: 1_000,
        };

        assert!(!hasher.verify("anything", &stored));
    }

    #[test]
    fn test_verify_zero_iterations_returns_false() {
        let hasher = hasher();
        let mut stored = hasher.hash("Team@007").unwrap();
        stored.iterations = 0;

        assert!(!hasher.verify("Team@007", &stored));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"hello", b"hell"));
    }
}
