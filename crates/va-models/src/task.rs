//! Task model
//!
//! A task belongs to its creator, is assigned to one or more delegates and
//! embeds its subtasks (each with their own delegates).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Id, Identifiable, Owned, UnknownVariant};

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    /// Case-insensitive, so `/task/priority/high` works
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match normalized.as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "inprogress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(UnknownVariant {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// A person responsible for a task or subtask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegate {
    /// Set when the delegate is a registered user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl Delegate {
    pub fn matches_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}

/// Subtask embedded in a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(rename = "_id")]
    pub id: Id,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub delegate: Vec<Delegate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Subtask {
    pub fn has_delegate_user(&self, user_id: Id) -> bool {
        self.delegate.iter().any(|d| d.user_id == Some(user_id))
    }

    pub fn has_delegate_email(&self, email: &str) -> bool {
        self.delegate.iter().any(|d| d.matches_email(email))
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now && !self.status.is_completed()
    }
}

/// Task entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: Id,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub delegate: Vec<Delegate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    pub user_id: Id,
    #[serde(default)]
    pub sub_tasks: Vec<Subtask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Task {
    fn id(&self) -> Id {
        self.id
    }
}

impl Owned for Task {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

impl Task {
    pub fn has_delegate_user(&self, user_id: Id) -> bool {
        self.delegate.iter().any(|d| d.user_id == Some(user_id))
    }

    pub fn has_delegate_email(&self, email: &str) -> bool {
        self.delegate.iter().any(|d| d.matches_email(email))
    }

    /// Owner or registered main delegate
    pub fn is_visible_to(&self, user_id: Id) -> bool {
        self.is_owned_by(user_id) || self.has_delegate_user(user_id)
    }

    /// Owner, main delegate, or delegate on any subtask
    pub fn involves_user(&self, user_id: Id) -> bool {
        self.is_visible_to(user_id) || self.sub_tasks.iter().any(|s| s.has_delegate_user(user_id))
    }

    /// Email appears on the task or any of its subtasks
    pub fn involves_email(&self, email: &str) -> bool {
        self.has_delegate_email(email) || self.sub_tasks.iter().any(|s| s.has_delegate_email(email))
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now && !self.status.is_completed()
    }

    pub fn subtask(&self, subtask_id: Id) -> Option<&Subtask> {
        self.sub_tasks.iter().find(|s| s.id == subtask_id)
    }

    pub fn subtask_mut(&mut self, subtask_id: Id) -> Option<&mut Subtask> {
        self.sub_tasks.iter_mut().find(|s| s.id == subtask_id)
    }

    /// Remove a subtask, returning whether it existed
    pub fn remove_subtask(&mut self, subtask_id: Id) -> bool {
        let before = self.sub_tasks.len();
        self.sub_tasks.retain(|s| s.id != subtask_id);
        self.sub_tasks.len() != before
    }

    /// Case-insensitive text match on title, description or any subtask title
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .sub_tasks
                .iter()
                .any(|s| s.title.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn delegate(email: &str, user_id: Option<Id>) -> Delegate {
        Delegate {
            user_id,
            name: None,
            email: email.to_string(),
        }
    }

    fn task(owner: Id) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Quarterly report".into(),
            description: "Compile numbers".into(),
            due_date: now + Duration::days(3),
            delegate: vec![delegate("ann@example.com", None)],
            priority: Priority::High,
            status: TaskStatus::Pending,
            user_id: owner,
            sub_tasks: vec![Subtask {
                id: Uuid::new_v4(),
                title: "Collect invoices".into(),
                description: "From finance".into(),
                due_date: now + Duration::days(1),
                delegate: vec![delegate("bob@example.com", Some(Uuid::new_v4()))],
                priority: Priority::Medium,
                status: TaskStatus::Pending,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        assert_eq!("in progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("In-Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::default(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_involvement() {
        let owner = Uuid::new_v4();
        let t = task(owner);
        let sub_user = t.sub_tasks[0].delegate[0].user_id.unwrap();

        assert!(t.is_visible_to(owner));
        assert!(!t.is_visible_to(sub_user));
        assert!(t.involves_user(sub_user));
        assert!(t.involves_email("BOB@example.com"));
        assert!(t.has_delegate_email("ann@example.com"));
    }

    #[test]
    fn test_text_match_includes_subtasks() {
        let t = task(Uuid::new_v4());
        assert!(t.matches_text("REPORT"));
        assert!(t.matches_text("invoices"));
        assert!(!t.matches_text("holiday"));
    }

    #[test]
    fn test_remove_subtask() {
        let mut t = task(Uuid::new_v4());
        let sub_id = t.sub_tasks[0].id;
        assert!(t.remove_subtask(sub_id));
        assert!(!t.remove_subtask(sub_id));
    }

    #[test]
    fn test_json_shape() {
        let t = task(Uuid::new_v4());
        let value = serde_json::to_value(&t).unwrap();
        assert!(value.get("_id").is_some());
        assert!(value.get("subTasks").is_some());
        assert_eq!(value["priority"], "High");
        assert!(value["delegate"][0].get("userId").is_none());
    }
}
