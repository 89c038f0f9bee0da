//! Contact payloads and contracts

use serde::Deserialize;
use serde_json::Value;
use va_core::error::ValidationErrors;

use crate::base::{base_error, is_blank, is_valid_email, is_valid_phone, scalar_text, Contract, ValidationResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    /// Stored as text; clients may send a number
    pub phone_number: Option<Value>,
}

impl ContactInput {
    pub fn phone(&self) -> Option<String> {
        self.phone_number.as_ref().and_then(scalar_text)
    }
}

fn check_formats(input: &ContactInput, errors: &mut ValidationErrors) {
    if let Some(email) = &input.email {
        if !is_valid_email(email) {
            errors.add("email", "is not a valid email address");
        }
    }
    if let Some(phone) = input.phone() {
        if !is_valid_phone(&phone) {
            errors.add("phoneNumber", "is not a valid phone number");
        }
    }
}

pub struct CreateContactContract;

impl Contract<ContactInput> for CreateContactContract {
    fn validate(&self, input: &ContactInput) -> ValidationResult {
        if is_blank(&input.name)
            || is_blank(&input.company_name)
            || is_blank(&input.email)
            || input.phone().is_none()
        {
            return Err(base_error(
                "Name, company name, email, and phone number are required",
            ));
        }
        let mut errors = ValidationErrors::new();
        check_formats(input, &mut errors);
        errors.into_result()
    }
}

pub struct UpdateContactContract;

impl Contract<ContactInput> for UpdateContactContract {
    fn validate(&self, input: &ContactInput) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("name", &input.name),
            ("companyName", &input.company_name),
            ("email", &input.email),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                errors.add(field, "can't be blank");
            }
        }
        check_formats(input, &mut errors);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phone_as_number() {
        let input: ContactInput = serde_json::from_value(json!({
            "name": "Jane", "companyName": "Acme", "email": "jane@acme.com", "phoneNumber": 712345678
        }))
        .unwrap();
        assert_eq!(input.phone().as_deref(), Some("712345678"));
        assert!(CreateContactContract.validate(&input).is_ok());
    }

    #[test]
    fn test_missing_phone() {
        let input: ContactInput = serde_json::from_value(json!({
            "name": "Jane", "companyName": "Acme", "email": "jane@acme.com"
        }))
        .unwrap();
        assert_eq!(
            CreateContactContract.validate(&input).unwrap_err().full_messages(),
            vec!["Name, company name, email, and phone number are required"]
        );
    }

    #[test]
    fn test_update_rejects_blank_and_bad_email() {
        let input = ContactInput {
            name: Some(" ".into()),
            email: Some("nope".into()),
            ..Default::default()
        };
        let err = UpdateContactContract.validate(&input).unwrap_err();
        assert!(err.has_error("name"));
        assert!(err.has_error("email"));
    }
}
