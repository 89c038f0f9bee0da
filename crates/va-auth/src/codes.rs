//! Emailed one-time codes
//!
//! The plain six-digit code goes into the email; only its SHA-256 digest is
//! stored on the user.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// A freshly generated code
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: String,
    pub hashed: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedCode {
    pub fn new(ttl_seconds: i64) -> Self {
        let code = generate_code();
        Self {
            hashed: hash_code(&code),
            code,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        }
    }
}

/// Random number in 100000..=999999
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

/// Hex SHA-256 of the trimmed code
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    hex::encode(hasher.finalize())
}
