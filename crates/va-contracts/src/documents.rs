//! Document payloads and contracts

use serde::Deserialize;
use serde_json::Value;
use va_core::error::ValidationErrors;
use va_models::{DocumentType, ReceptionMode, ResponseStatus};

use crate::base::{base_error, is_blank, Contract, ValidationResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInput {
    pub title: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub summary: Option<String>,
    pub res_status: Option<Value>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub reception_mode: Option<String>,
    pub file_category: Option<String>,
    pub responded_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sender: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub reception_mode: Option<String>,
    pub file_category: Option<String>,
    pub response_status: Option<String>,
    pub responses: Option<Vec<ResponseInput>>,
}

impl DocumentInput {
    pub fn response_status(&self) -> Option<ResponseStatus> {
        self.response_status.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Query-string filters for the document register
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    pub title: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub category: Option<String>,
    pub sender: Option<String>,
    pub file_category: Option<String>,
    pub reception_mode: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn check_mode_and_type(
    reception_mode: &Option<String>,
    doc_type: &Option<String>,
    file_category: &Option<String>,
    errors: &mut ValidationErrors,
) {
    if let Some(mode) = reception_mode {
        match mode.parse::<ReceptionMode>() {
            Ok(mode) if mode.requires_file_category() && is_blank(file_category) => {
                errors.add_base("fileCategory is required when receptionMode is in-person");
            }
            Ok(_) => {}
            Err(_) => errors.add("receptionMode", "must be virtual or in-person"),
        }
    }
    if let Some(t) = doc_type {
        if t.parse::<DocumentType>().is_err() {
            errors.add("type", "must be incoming or outgoing");
        }
    }
}

fn check_responses(input: &DocumentInput, errors: &mut ValidationErrors) {
    if let Some(status) = &input.response_status {
        if status.parse::<ResponseStatus>().is_err() {
            errors.add("responseStatus", "is not included in the list");
            return;
        }
    }
    if input.response_status() != Some(ResponseStatus::Responded) {
        return;
    }

    let responses = input.responses.as_deref().unwrap_or_default();
    if responses.is_empty() {
        errors.add_base("At least one response must be provided when responseStatus is 'responded'");
        return;
    }
    for (index, response) in responses.iter().enumerate() {
        if is_blank(&response.title) || is_blank(&response.summary) || is_blank(&response.reception_mode) {
            errors.add_base(format!(
                "Response at index {} is missing required fields (title, summary, or receptionMode)",
                index
            ));
            continue;
        }
        if let Some(mode) = &response.reception_mode {
            if mode.parse::<ReceptionMode>().is_err() {
                errors.add(format!("responses[{}].receptionMode", index), "must be virtual or in-person");
            }
        }
    }
}

pub struct CreateDocumentContract;

impl Contract<DocumentInput> for CreateDocumentContract {
    fn validate(&self, input: &DocumentInput) -> ValidationResult {
        if is_blank(&input.title)
            || is_blank(&input.description)
            || is_blank(&input.sender)
            || is_blank(&input.reception_mode)
            || is_blank(&input.doc_type)
        {
            return Err(base_error(
                "Title, description, sender, receptionMode, and type are required",
            ));
        }

        let mut errors = ValidationErrors::new();
        check_mode_and_type(&input.reception_mode, &input.doc_type, &input.file_category, &mut errors);
        check_responses(input, &mut errors);
        errors.into_result()
    }
}

pub struct UpdateDocumentContract;

impl Contract<DocumentInput> for UpdateDocumentContract {
    fn validate(&self, input: &DocumentInput) -> ValidationResult {
        if is_blank(&input.title)
            || is_blank(&input.description)
            || is_blank(&input.sender)
            || is_blank(&input.doc_type)
        {
            return Err(base_error(
                "Title, description, sender, and type are required",
            ));
        }

        let mut errors = ValidationErrors::new();
        check_mode_and_type(&input.reception_mode, &input.doc_type, &input.file_category, &mut errors);
        check_responses(input, &mut errors);
        errors.into_result()
    }
}

/// A response appended through `POST /document/response/:id`
pub struct AddResponseContract;

impl Contract<ResponseInput> for AddResponseContract {
    fn validate(&self, input: &ResponseInput) -> ValidationResult {
        if is_blank(&input.title) || is_blank(&input.summary) {
            return Err(base_error("Response title and summary are required"));
        }
        if input.doc_type.as_deref().and_then(|t| t.parse::<DocumentType>().ok()).is_none() {
            return Err(base_error("Response type must be incoming or outgoing"));
        }
        let mode = input
            .reception_mode
            .as_deref()
            .and_then(|m| m.parse::<ReceptionMode>().ok());
        match mode {
            None => Err(base_error("Reception mode must be virtual or in-person")),
            Some(mode) if mode.requires_file_category() && is_blank(&input.file_category) => Err(
                base_error("fileCategory is required when reception mode is in-person"),
            ),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> DocumentInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_requires_fields() {
        let err = CreateDocumentContract.validate(&doc(json!({ "title": "Memo" }))).unwrap_err();
        assert_eq!(
            err.full_messages(),
            vec!["Title, description, sender, receptionMode, and type are required"]
        );
    }

    #[test]
    fn test_in_person_needs_file_category() {
        let input = doc(json!({
            "title": "Memo", "description": "d", "sender": "HR",
            "receptionMode": "in-person", "type": "incoming"
        }));
        let err = CreateDocumentContract.validate(&input).unwrap_err();
        assert_eq!(
            err.full_messages(),
            vec!["fileCategory is required when receptionMode is in-person"]
        );
    }

    #[test]
    fn test_responded_requires_responses() {
        let input = doc(json!({
            "title": "Memo", "description": "d", "sender": "HR",
            "receptionMode": "virtual", "type": "incoming",
            "responseStatus": "responded", "responses": []
        }));
        assert!(CreateDocumentContract.validate(&input).is_err());

        let input = doc(json!({
            "title": "Memo", "description": "d", "sender": "HR",
            "receptionMode": "virtual", "type": "incoming",
            "responseStatus": "responded",
            "responses": [{ "title": "Reply", "summary": "ok", "receptionMode": "virtual" }]
        }));
        assert!(CreateDocumentContract.validate(&input).is_ok());
    }

    #[test]
    fn test_update_does_not_need_mode() {
        let input = doc(json!({
            "title": "Memo", "description": "d", "sender": "HR", "type": "outgoing"
        }));
        assert!(UpdateDocumentContract.validate(&input).is_ok());
    }

    #[test]
    fn test_add_response() {
        let input: ResponseInput = serde_json::from_value(json!({
            "title": "Reply", "summary": "Done", "type": "sideways", "receptionMode": "virtual"
        }))
        .unwrap();
        assert_eq!(
            AddResponseContract.validate(&input).unwrap_err().full_messages(),
            vec!["Response type must be incoming or outgoing"]
        );

        let input: ResponseInput = serde_json::from_value(json!({
            "title": "Reply", "summary": "Done", "type": "outgoing",
            "receptionMode": "in-person", "fileCategory": "Cabinet A"
        }))
        .unwrap();
        assert!(AddResponseContract.validate(&input).is_ok());
    }
}
