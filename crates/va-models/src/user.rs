//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Id, Identifiable};

/// User entity
///
/// Password hash and the hashed verification/reset codes never leave the
/// server: they are skipped when serializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    #[serde(skip_serializing, default)]
    pub verify_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub verify_token_expiry: Option<DateTime<Utc>>,
    #[serde(skip_serializing, default)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for User {
    fn id(&self) -> Id {
        self.id
    }
}

impl User {
    /// Verification code is present and not yet expired
    pub fn verify_token_valid(&self, hashed: &str, now: DateTime<Utc>) -> bool {
        token_matches(&self.verify_token, self.verify_token_expiry, hashed, now)
    }

    pub fn reset_token_valid(&self, hashed: &str, now: DateTime<Utc>) -> bool {
        token_matches(&self.reset_token, self.reset_token_expiry, hashed, now)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }
}

fn token_matches(
    stored: &Option<String>,
    expiry: Option<DateTime<Utc>>,
    hashed: &str,
    now: DateTime<Utc>,
) -> bool {
    match (stored, expiry) {
        (Some(stored), Some(expiry)) => stored == hashed && expiry > now,
        _ => false,
    }
}

/// Public identity of a user embedded in other responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Id,
    pub full_name: String,
    pub email: String,
}
