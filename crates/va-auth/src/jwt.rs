//! JWT tokens
//!
//! Session tokens carry the user id as subject. Password-reset tokens are a
//! separate claim set so a reset token can never be used as a session.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use va_core::Id;

/// Session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// JWT ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Password-reset claims
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub id: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token is expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),
}

/// Creates and validates HS256 tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// `(iat, exp)` for a token living `seconds` from now
fn timestamp_after(seconds: i64) -> (usize, usize) {
    let now = Utc::now().timestamp();
    (now.max(0) as usize, (now + seconds).max(0) as usize)
}

impl JwtService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Create a session token for `user_id`
    pub fn create_token(&self, user_id: Id, expires_in_seconds: i64) -> Result<String, JwtError> {
        let (iat, exp) = timestamp_after(expires_in_seconds);
        let claims = Claims {
            sub: user_id.to_string(),
            exp,
            iat,
            jti: Some(uuid::Uuid::new_v4().to_string()),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    fn decode_claims<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.decode_claims(token)
    }

    /// Extract the user id from a valid session token
    pub fn get_user_id(&self, token: &str) -> Result<Id, JwtError> {
        let claims = self.validate_token(token)?;
        claims
            .sub
            .parse()
            .map_err(|_| JwtError::Invalid("Invalid user ID in token".to_string()))
    }

    pub fn create_reset_token(
        &self,
        user_id: Id,
        email: &str,
        expires_in_seconds: i64,
    ) -> Result<String, JwtError> {
        let (iat, exp) = timestamp_after(expires_in_seconds);
        let claims = ResetClaims {
            id: user_id.to_string(),
            email: email.to_string(),
            exp,
            iat,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Returns the user id and email carried by a reset token
    pub fn validate_reset_token(&self, token: &str) -> Result<(Id, String), JwtError> {
        let claims: ResetClaims = self.decode_claims(token)?;
        let id = claims
            .id
            .parse()
            .map_err(|_| JwtError::Invalid("Invalid user ID in token".to_string()))?;
        Ok((id, claims.email))
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes";

    #[test]
    fn test_create_and_validate_token() {
        let service = JwtService::new(SECRET);
        let user_id = Uuid::new_v4();

        let token = service.create_token(user_id, 3600).unwrap();
        assert_eq!(service.get_user_id(&token).unwrap(), user_id);
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new(SECRET);
        let token = service.create_token(Uuid::new_v4(), -10).unwrap();
        assert!(matches!(service.validate_token(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_secret() {
        let token = JwtService::new(SECRET).create_token(Uuid::new_v4(), 60).unwrap();
        let other = JwtService::new(b"another-secret-key-also-32-bytes!");
        assert!(matches!(other.validate_token(&token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_reset_token_is_not_a_session() {
        let service = JwtService::new(SECRET);
        let user_id = Uuid::new_v4();

        let reset = service.create_reset_token(user_id, "a@b.com", 600).unwrap();
        let (id, email) = service.validate_reset_token(&reset).unwrap();
        assert_eq!(id, user_id);
        assert_eq!(email, "a@b.com");

        assert!(service.validate_token(&reset).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
