//! Account payloads and contracts

use serde::Deserialize;
use va_core::error::ValidationErrors;

use crate::base::{base_error, is_blank, is_valid_email, Contract, ValidationResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Six-digit code typed in by the user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenInput {
    pub token: Option<serde_json::Value>,
}

impl TokenInput {
    pub fn code(&self) -> Option<String> {
        self.token.as_ref().and_then(crate::base::scalar_text)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailInput {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    #[serde(alias = "newPassword")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

/// Registration requires every field and a plausible email
pub struct RegisterContract;

impl Contract<RegisterInput> for RegisterContract {
    fn validate(&self, input: &RegisterInput) -> ValidationResult {
        if is_blank(&input.user_name)
            || is_blank(&input.email)
            || is_blank(&input.password)
            || is_blank(&input.full_name)
        {
            return Err(base_error("All fields are required"));
        }

        let mut errors = ValidationErrors::new();
        if let Some(email) = &input.email {
            if !is_valid_email(email) {
                errors.add("email", "is not a valid email address");
            }
        }
        errors.into_result()
    }
}

pub struct LoginContract;

impl Contract<LoginInput> for LoginContract {
    fn validate(&self, input: &LoginInput) -> ValidationResult {
        if is_blank(&input.email) || is_blank(&input.password) {
            return Err(base_error("All fields are required"));
        }
        Ok(())
    }
}

pub struct TokenContract;

impl Contract<TokenInput> for TokenContract {
    fn validate(&self, input: &TokenInput) -> ValidationResult {
        match input.code() {
            Some(_) => Ok(()),
            None => Err(base_error("Token is required")),
        }
    }
}

pub struct EmailContract;

impl Contract<EmailInput> for EmailContract {
    fn validate(&self, input: &EmailInput) -> ValidationResult {
        if is_blank(&input.email) {
            return Err(base_error("Email is required"));
        }
        Ok(())
    }
}

pub struct ResetPasswordContract;

impl Contract<ResetPasswordInput> for ResetPasswordContract {
    fn validate(&self, input: &ResetPasswordInput) -> ValidationResult {
        if is_blank(&input.password) {
            return Err(base_error("Password is required"));
        }
        Ok(())
    }
}

/// At least one field must be present; a present email must be well formed
pub struct UpdateUserContract;

impl Contract<UpdateUserInput> for UpdateUserContract {
    fn validate(&self, input: &UpdateUserInput) -> ValidationResult {
        if input.user_name.is_none()
            && input.email.is_none()
            && input.full_name.is_none()
            && is_blank(&input.password)
        {
            return Err(base_error("At least one field is required to update"));
        }

        let mut errors = ValidationErrors::new();
        if let Some(email) = &input.email {
            if !is_valid_email(email) {
                errors.add("email", "is not a valid email address");
            }
        }
        if let Some(name) = &input.user_name {
            if name.trim().is_empty() {
                errors.add("userName", "can't be blank");
            }
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_requires_all_fields() {
        let input = RegisterInput {
            user_name: Some("jdoe".into()),
            email: Some("jdoe@example.com".into()),
            password: None,
            full_name: Some("John Doe".into()),
        };
        let err = RegisterContract.validate(&input).unwrap_err();
        assert_eq!(err.full_messages(), vec!["All fields are required"]);
    }

    #[test]
    fn test_register_rejects_bad_email() {
        let input = RegisterInput {
            user_name: Some("jdoe".into()),
            email: Some("not-an-email".into()),
            password: Some("pw".into()),
            full_name: Some("John Doe".into()),
        };
        let err = RegisterContract.validate(&input).unwrap_err();
        assert!(err.has_error("email"));
    }

    #[test]
    fn test_token_accepts_numbers() {
        let input: TokenInput = serde_json::from_value(json!({ "token": 123456 })).unwrap();
        assert!(TokenContract.validate(&input).is_ok());
        assert_eq!(input.code().as_deref(), Some("123456"));
    }

    #[test]
    fn test_reset_password_alias() {
        let input: ResetPasswordInput =
            serde_json::from_value(json!({ "newPassword": "s3cret" })).unwrap();
        assert!(ResetPasswordContract.validate(&input).is_ok());
    }

    #[test]
    fn test_update_needs_something() {
        assert!(UpdateUserContract.validate(&UpdateUserInput::default()).is_err());
        let input = UpdateUserInput {
            full_name: Some("New Name".into()),
            ..Default::default()
        };
        assert!(UpdateUserContract.validate(&input).is_ok());
    }
}
