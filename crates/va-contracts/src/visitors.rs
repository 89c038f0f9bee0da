//! Visitor and note payloads

use serde::Deserialize;
use va_core::error::ValidationErrors;

use crate::base::{base_error, is_blank, Contract, ValidationResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitorInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

pub struct CreateVisitorContract;

impl Contract<VisitorInput> for CreateVisitorContract {
    fn validate(&self, input: &VisitorInput) -> ValidationResult {
        if is_blank(&input.name) || is_blank(&input.email) || is_blank(&input.phone) {
            return Err(base_error("Name, email, and phone are required"));
        }
        Ok(())
    }
}

pub struct UpdateVisitorContract;

impl Contract<VisitorInput> for UpdateVisitorContract {
    fn validate(&self, input: &VisitorInput) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        for (field, value) in [("name", &input.name), ("email", &input.email), ("phone", &input.phone)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                errors.add(field, "can't be blank");
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
}

pub struct CreateNoteContract;

impl Contract<NoteInput> for CreateNoteContract {
    fn validate(&self, input: &NoteInput) -> ValidationResult {
        if is_blank(&input.title) || is_blank(&input.content_html) || is_blank(&input.content_text) {
            return Err(base_error("Title, contentHtml, and contentText are required"));
        }
        Ok(())
    }
}
