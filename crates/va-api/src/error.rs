//! API error handling
//!
//! Every failure leaves the API as
//! `{"success": false, "message", "errorCode", "errors"?}` with the status
//! code of the underlying [`VaError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use va_core::VaError;

/// Error returned by handlers
#[derive(Debug)]
pub struct ApiError(pub VaError);

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError(VaError::unauthorized(msg))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError(VaError::forbidden(msg))
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError(VaError::bad_request(msg))
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<VaError> for ApiError {
    fn from(err: VaError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    message: String,
    error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.error_code(), "Request failed");
        }

        let message = match &self.0 {
            // Internals stay in the log
            VaError::Database(_) | VaError::Internal(_) | VaError::Config(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let errors = match &self.0 {
            VaError::Validation(v) if !v.errors.is_empty() => Some(v.errors.clone()),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            message,
            error_code: self.0.error_code(),
            errors,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use va_core::error::ValidationErrors;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError(VaError::not_found("x")).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);

        let mut errors = ValidationErrors::new();
        errors.add("email", "is invalid");
        assert_eq!(ApiError(errors.into()).status_code(), StatusCode::BAD_REQUEST);

        let provider = VaError::ExternalService {
            service: "resend".into(),
            status: Some(403),
            message: "forbidden".into(),
        };
        assert_eq!(ApiError(provider).status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_internal_message_hidden() {
        let response = ApiError(VaError::Database("connection refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
