//! # va-auth
//!
//! Authentication for SmartVA RS.
//!
//! ## Features
//!
//! - JWT session tokens and short-lived password-reset tokens
//! - Argon2 password hashing
//! - Six-digit verification / reset codes stored as SHA-256 digests
//! - Cookie header building and token extraction (cookie first, then bearer)

pub mod codes;
pub mod cookies;
pub mod jwt;
pub mod password;

pub use codes::{generate_code, hash_code, IssuedCode};
pub use cookies::{extract_cookie, extract_request_token, CookieConfig, SameSite, RESET_COOKIE, SESSION_COOKIE};
pub use jwt::{Claims, JwtError, JwtService, ResetClaims};
pub use password::{hash_password, verify_password, PasswordError};
