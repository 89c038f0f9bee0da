//! Task payloads and contracts

use serde::Deserialize;
use va_core::error::ValidationErrors;
use va_core::types::parse_datetime;
use va_models::{Priority, TaskStatus};

use crate::base::{base_error, is_blank, Contract, OneOrMany, ValidationResult};

/// Delegate as sent by clients: a bare email or an object carrying one
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DelegateInput {
    Email(String),
    Detailed {
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl DelegateInput {
    /// Trimmed, lower-cased email if one was supplied
    pub fn email(&self) -> Option<String> {
        let raw = match self {
            DelegateInput::Email(email) => Some(email.as_str()),
            DelegateInput::Detailed { email, .. } => email.as_deref(),
        };
        raw.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty())
    }
}

pub type DelegateList = OneOrMany<DelegateInput>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskInput {
    /// Present when an update refers to an existing subtask
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub delegate: Option<DelegateList>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub delegate: Option<DelegateList>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub sub_tasks: Option<Vec<SubtaskInput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub delegate: Option<DelegateList>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub sub_tasks: Option<Vec<SubtaskInput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusInput {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateMessageInput {
    pub delegate_email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskMessageInput {
    pub message: Option<String>,
    pub delegate_name: Option<String>,
    pub delegate_email: Option<String>,
}

/// Status change requested by a delegate from their smart space
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateStatusInput {
    pub status: Option<String>,
    #[serde(default)]
    pub is_subtask: bool,
    pub subtask_id: Option<String>,
}

fn validate_enums(
    priority: &Option<String>,
    status: &Option<String>,
    due_date: &Option<String>,
    prefix: &str,
    errors: &mut ValidationErrors,
) {
    if let Some(p) = priority {
        if p.parse::<Priority>().is_err() {
            errors.add(format!("{}priority", prefix), "is not included in the list");
        }
    }
    if let Some(s) = status {
        if s.parse::<TaskStatus>().is_err() {
            errors.add(format!("{}status", prefix), "is not included in the list");
        }
    }
    if let Some(d) = due_date {
        if parse_datetime(d).is_none() {
            errors.add(format!("{}dueDate", prefix), "is not a valid date");
        }
    }
}

fn validate_delegates(list: &Option<DelegateList>, errors: &mut ValidationErrors) -> bool {
    let Some(list) = list else { return true };
    let ok = match list {
        OneOrMany::One(d) => d.email().is_some(),
        OneOrMany::Many(items) => items.iter().all(|d| d.email().is_some()),
    };
    if !ok {
        errors.add_base("Invalid delegate format");
    }
    ok
}

fn validate_subtasks(subtasks: &Option<Vec<SubtaskInput>>, require_fields: bool, errors: &mut ValidationErrors) {
    let Some(subtasks) = subtasks else { return };
    for (index, sub) in subtasks.iter().enumerate() {
        let prefix = format!("subTasks[{}].", index);
        let is_new = sub.id.is_none();
        if require_fields || is_new {
            if is_blank(&sub.title) {
                errors.add(format!("{}title", prefix), "can't be blank");
            }
            if is_blank(&sub.description) {
                errors.add(format!("{}description", prefix), "can't be blank");
            }
            if is_blank(&sub.due_date) {
                errors.add(format!("{}dueDate", prefix), "can't be blank");
            }
        }
        validate_enums(&sub.priority, &sub.status, &sub.due_date, &prefix, errors);
        validate_delegates(&sub.delegate, errors);
    }
}

/// Everything except subtasks is mandatory on creation
pub struct CreateTaskContract;

impl Contract<CreateTaskInput> for CreateTaskContract {
    fn validate(&self, input: &CreateTaskInput) -> ValidationResult {
        let delegate_missing = input.delegate.as_ref().map_or(true, OneOrMany::is_empty);
        if is_blank(&input.title)
            || is_blank(&input.description)
            || is_blank(&input.due_date)
            || is_blank(&input.priority)
            || delegate_missing
        {
            return Err(base_error("All fields except subtasks are required"));
        }

        let mut errors = ValidationErrors::new();
        validate_delegates(&input.delegate, &mut errors);
        validate_enums(&input.priority, &input.status, &input.due_date, "", &mut errors);
        validate_subtasks(&input.sub_tasks, true, &mut errors);
        errors.into_result()
    }
}

/// Partial update: only what is present is checked
pub struct UpdateTaskContract;

impl Contract<UpdateTaskInput> for UpdateTaskContract {
    fn validate(&self, input: &UpdateTaskInput) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                errors.add("title", "can't be blank");
            }
        }
        validate_delegates(&input.delegate, &mut errors);
        validate_enums(&input.priority, &input.status, &input.due_date, "", &mut errors);
        validate_subtasks(&input.sub_tasks, false, &mut errors);
        errors.into_result()
    }
}

pub struct StatusContract;

impl Contract<StatusInput> for StatusContract {
    fn validate(&self, input: &StatusInput) -> ValidationResult {
        match &input.status {
            None => Err(base_error("Status is required")),
            Some(s) if s.trim().is_empty() => Err(base_error("Status is required")),
            Some(s) if s.parse::<TaskStatus>().is_err() => {
                Err(base_error(format!("Invalid status: {}", s)))
            }
            Some(_) => Ok(()),
        }
    }
}

impl Contract<DelegateStatusInput> for StatusContract {
    fn validate(&self, input: &DelegateStatusInput) -> ValidationResult {
        self.validate(&StatusInput {
            status: input.status.clone(),
        })?;
        if input.is_subtask && is_blank(&input.subtask_id) {
            return Err(base_error("Subtask ID is required"));
        }
        Ok(())
    }
}

pub struct DelegateMessageContract;

impl Contract<DelegateMessageInput> for DelegateMessageContract {
    fn validate(&self, input: &DelegateMessageInput) -> ValidationResult {
        if is_blank(&input.delegate_email) || is_blank(&input.subject) || is_blank(&input.message) {
            return Err(base_error(
                "Delegate email, subject, and message are required",
            ));
        }
        Ok(())
    }
}

pub struct SubtaskMessageContract;

impl Contract<SubtaskMessageInput> for SubtaskMessageContract {
    fn validate(&self, input: &SubtaskMessageInput) -> ValidationResult {
        if is_blank(&input.message) {
            return Err(base_error("Message is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_input(value: serde_json::Value) -> CreateTaskInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_delegate_forms() {
        let input = create_input(json!({
            "title": "Report",
            "description": "Q3",
            "dueDate": "2030-01-01T10:00:00Z",
            "priority": "High",
            "delegate": [" Ann@Example.com ", { "email": "bob@example.com", "name": "Bob" }]
        }));
        assert!(CreateTaskContract.validate(&input).is_ok());

        let delegates = input.delegate.unwrap().into_vec();
        assert_eq!(delegates[0].email().as_deref(), Some("ann@example.com"));
        assert_eq!(delegates[1].email().as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn test_single_delegate_string() {
        let input = create_input(json!({
            "title": "Report",
            "description": "Q3",
            "dueDate": "2030-01-01",
            "priority": "Low",
            "delegate": "ann@example.com"
        }));
        assert!(CreateTaskContract.validate(&input).is_ok());
    }

    #[test]
    fn test_missing_fields() {
        let input = create_input(json!({ "title": "Report", "delegate": [] }));
        let err = CreateTaskContract.validate(&input).unwrap_err();
        assert_eq!(
            err.full_messages(),
            vec!["All fields except subtasks are required"]
        );
    }

    #[test]
    fn test_delegate_without_email() {
        let input = create_input(json!({
            "title": "Report",
            "description": "Q3",
            "dueDate": "2030-01-01",
            "priority": "High",
            "delegate": [{ "name": "Nobody" }]
        }));
        let err = CreateTaskContract.validate(&input).unwrap_err();
        assert_eq!(err.full_messages(), vec!["Invalid delegate format"]);
    }

    #[test]
    fn test_bad_priority_and_subtask() {
        let input = create_input(json!({
            "title": "Report",
            "description": "Q3",
            "dueDate": "2030-01-01",
            "priority": "Urgent",
            "delegate": "ann@example.com",
            "subTasks": [{ "title": "Part", "description": "" }]
        }));
        let err = CreateTaskContract.validate(&input).unwrap_err();
        assert!(err.has_error("priority"));
        assert!(err.has_error("subTasks[0].description"));
        assert!(err.has_error("subTasks[0].dueDate"));
    }

    #[test]
    fn test_status_contract() {
        let ok = StatusInput { status: Some("In Progress".into()) };
        assert!(StatusContract.validate(&ok).is_ok());

        let missing = StatusInput { status: None };
        assert_eq!(
            StatusContract.validate(&missing).unwrap_err().full_messages(),
            vec!["Status is required"]
        );

        let sub = DelegateStatusInput {
            status: Some("Completed".into()),
            is_subtask: true,
            subtask_id: None,
        };
        assert!(StatusContract.validate(&sub).is_err());
    }

    #[test]
    fn test_update_allows_existing_subtask_partial() {
        let input: UpdateTaskInput = serde_json::from_value(json!({
            "subTasks": [{ "_id": "7b0e4cf6-3e1a-4c55-9a39-5d1f0c7f1a11", "status": "Completed" }]
        }))
        .unwrap();
        assert!(UpdateTaskContract.validate(&input).is_ok());
    }
}
