//! Base contract system
//!
//! A contract inspects a request payload before a service acts on it and
//! reports every problem it finds as [`ValidationErrors`].

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use va_core::error::ValidationErrors;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// Base contract trait
pub trait Contract<T>: Send + Sync {
    /// Validate the payload
    fn validate(&self, input: &T) -> ValidationResult;
}

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ()\-]{5,}$").expect("Invalid phone regex")
});

/// Missing, empty or whitespace-only
pub fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

pub fn is_valid_email(value: &str) -> bool {
    validator::validate_email(value.trim())
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_REGEX.is_match(value.trim())
}

/// Loose truthiness for flags that clients send as bools, strings or numbers
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false" && s != "0",
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a scalar that may arrive as a JSON string or number
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A field that accepts either a single item or a list of items
///
/// `Many` is tried first so a list is never read as a struct in sequence form.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            OneOrMany::One(_) => false,
            OneOrMany::Many(items) => items.is_empty(),
        }
    }
}

/// Build a single base error
pub fn base_error(message: impl Into<String>) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add_base(message);
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank() {
        assert!(is_blank(&None));
        assert!(is_blank(&Some("   ".into())));
        assert!(!is_blank(&Some("x".into())));
    }

    #[test]
    fn test_truthy() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!("true")));
        assert!(is_truthy(&json!(1)));
        assert!(!is_truthy(&json!("false")));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!(712345678)), Some("712345678".into()));
        assert_eq!(scalar_text(&json!(" +254 700 ")), Some("+254 700".into()));
        assert_eq!(scalar_text(&json!(null)), None);
    }

    #[test]
    fn test_one_or_many() {
        let one: OneOrMany<String> = serde_json::from_value(json!("a@b.com")).unwrap();
        assert_eq!(one.into_vec().len(), 1);

        let many: OneOrMany<String> = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn test_email_and_phone() {
        assert!(is_valid_email("jane@example.com"));
        assert!(!is_valid_email("jane"));
        assert!(is_valid_phone("+254 700-000 000"));
        assert!(!is_valid_phone("call me"));
    }
}
