//! Core error types for SmartVA RS
//!
//! Every service operation returns [`VaError`]; the API layer maps it onto
//! HTTP status codes.

use std::collections::BTreeMap;
use thiserror::Error;

/// Core error type for all SmartVA operations
#[derive(Error, Debug)]
pub enum VaError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {service} - {message}")]
    ExternalService {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },
}

impl VaError {
    pub fn not_found(message: impl Into<String>) -> Self {
        VaError::NotFound {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        VaError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        VaError::Forbidden {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        VaError::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        VaError::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        VaError::Internal(message.into())
    }

    /// A single base validation message
    pub fn invalid(message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add_base(message);
        VaError::Validation(errors)
    }

    /// HTTP status code mapping for errors
    pub fn status_code(&self) -> u16 {
        match self {
            VaError::NotFound { .. } => 404,
            VaError::Unauthorized { .. } => 401,
            VaError::Forbidden { .. } => 403,
            VaError::Validation(_) | VaError::BadRequest { .. } => 400,
            VaError::Conflict { .. } => 409,
            VaError::RateLimited { .. } => 429,
            VaError::Database(_) | VaError::Internal(_) | VaError::Config(_) => 500,
            VaError::ExternalService { status, .. } => match status {
                Some(401) | Some(403) => 503,
                Some(429) => 429,
                _ => 500,
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            VaError::NotFound { .. } => "not_found",
            VaError::Unauthorized { .. } => "unauthorized",
            VaError::Forbidden { .. } => "forbidden",
            VaError::Validation(_) => "validation_failed",
            VaError::BadRequest { .. } => "bad_request",
            VaError::Conflict { .. } => "conflict",
            VaError::Database(_) => "database_error",
            VaError::Internal(_) => "internal_error",
            VaError::Config(_) => "configuration_error",
            VaError::ExternalService { .. } => "external_service_error",
            VaError::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Validation errors collection
///
/// Field errors are kept ordered so rendered messages are stable.
#[derive(Error, Debug, Default, Clone, PartialEq, serde::Serialize)]
#[error("{}", self.full_messages().join(", "))]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: BTreeMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get errors for a specific field
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    /// Base errors first, then `"<field> <message>"` for every field error
    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// Turn the collection into a result, failing when any error was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
