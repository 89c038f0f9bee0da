//! Repository errors and shared query helpers

use std::str::FromStr;

use va_core::error::VaError;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db.constraint().unwrap_or("unique").to_string();
                return RepositoryError::Conflict(constraint);
            }
        }
        RepositoryError::Database(err)
    }
}

impl From<RepositoryError> for VaError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => VaError::not_found(format!("{} not found", what)),
            RepositoryError::Validation(message) => VaError::invalid(message),
            RepositoryError::Conflict(message) => VaError::conflict(message),
            RepositoryError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                VaError::Database(err.to_string())
            }
        }
    }
}

/// Parse a text column into one of the model enums
pub(crate) fn parse_column<T>(value: &str) -> RepositoryResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| RepositoryError::Validation(e.to_string()))
}

/// `%needle%` for ILIKE with the wildcard characters escaped
pub(crate) fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Case-insensitive substring match used by the memory stores
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
