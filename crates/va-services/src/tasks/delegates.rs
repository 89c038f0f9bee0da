//! Delegate normalization, delegate views and delegate-side actions

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use va_contracts::tasks::{
    DelegateList, DelegateMessageContract, DelegateMessageInput, DelegateStatusInput,
    StatusContract, StatusInput, SubtaskMessageContract, SubtaskMessageInput,
};
use va_contracts::Contract;
use va_core::{Id, Owned, VaError, VaResult};
use va_models::naming::derive_delegate_name;
use va_models::{Delegate, Subtask, Task, TaskStatus};

use super::TaskService;
use crate::context::ServiceContext;

/// Resolve client supplied delegates against registered users.
///
/// Registered users get their id and full name; anyone else gets a name
/// derived from the email. Duplicate emails collapse to the first entry.
pub(super) async fn normalize(
    ctx: &ServiceContext,
    list: Option<DelegateList>,
) -> VaResult<Vec<Delegate>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    let mut emails: Vec<String> = Vec::new();
    for input in list.into_vec() {
        let email = input
            .email()
            .ok_or_else(|| VaError::invalid("Invalid delegate format"))?;
        if !emails.contains(&email) {
            emails.push(email);
        }
    }

    let users = ctx.stores.users.find_by_emails(&emails).await?;
    Ok(emails
        .into_iter()
        .map(|email| match users.iter().find(|u| u.email.eq_ignore_ascii_case(&email)) {
            Some(user) => Delegate {
                user_id: Some(user.id),
                name: Some(user.full_name.clone()),
                email,
            },
            None => Delegate {
                user_id: None,
                name: Some(derive_delegate_name(&email)),
                email,
            },
        })
        .collect())
}

/// One row of the delegate directory
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelegateSummary {
    pub name: String,
    pub email: String,
    pub task_count: usize,
    /// Any assignment still `Pending`
    pub pending: bool,
    /// Any assignment past due and not completed
    pub overdue: bool,
}

/// A task or subtask assigned to a delegate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "_id")]
    pub id: Id,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub delegate_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateDetails {
    pub delegate_name: Option<String>,
    pub delegate_email: String,
    pub total_pending: usize,
    pub total_completed: usize,
    pub total_overdue: usize,
    pub assignments: Vec<Assignment>,
}

/// Either a whole task or one subtask
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WorkItem {
    Task(Task),
    Subtask(Subtask),
}

/// Delegate paired with the last matching task or subtask
#[derive(Debug, Clone, Serialize)]
pub struct DelegateWork {
    pub name: Option<String>,
    pub email: String,
    pub task: WorkItem,
}

/// Which assignments `delegates_by_status` keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateStatusFilter {
    Pending,
    Completed,
    Overdue,
}

impl DelegateStatusFilter {
    fn matches(&self, status: TaskStatus, due_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            DelegateStatusFilter::Pending => status == TaskStatus::Pending,
            DelegateStatusFilter::Completed => status.is_completed(),
            DelegateStatusFilter::Overdue => due_date < now,
        }
    }
}

/// Main-delegate tasks of one delegate, bucketed by state
#[derive(Debug, Clone, Default)]
pub struct DelegateTasks {
    pub all: Vec<Task>,
    pub pending: Vec<Task>,
    pub completed: Vec<Task>,
    pub overdue: Vec<Task>,
}

/// Subtasks of one task assigned to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateSubtasks {
    pub task_id: Id,
    pub task_title: String,
    pub subtasks: Vec<Subtask>,
}

impl TaskService {
    /// Unique delegates across the owner's tasks and subtasks, in first-seen order
    pub async fn all_delegates(&self, owner: Id) -> VaResult<Vec<DelegateSummary>> {
        let tasks = self.ctx.stores.tasks.list_owned(owner).await?;
        let now = Utc::now();

        let mut order: Vec<String> = Vec::new();
        let mut by_email: HashMap<String, DelegateSummary> = HashMap::new();
        let mut record = |d: &Delegate, status: TaskStatus, due: DateTime<Utc>| {
            let email = d.email.to_lowercase();
            let entry = by_email.entry(email.clone()).or_insert_with(|| {
                order.push(email.clone());
                DelegateSummary {
                    name: d.name.clone().unwrap_or_else(|| "Unknown".to_string()),
                    email,
                    task_count: 0,
                    pending: false,
                    overdue: false,
                }
            });
            entry.task_count += 1;
            entry.pending |= status == TaskStatus::Pending;
            entry.overdue |= due < now && !status.is_completed();
        };

        for task in &tasks {
            for d in &task.delegate {
                record(d, task.status, task.due_date);
            }
            for sub in &task.sub_tasks {
                for d in &sub.delegate {
                    record(d, sub.status, sub.due_date);
                }
            }
        }
        Ok(order.into_iter().filter_map(|e| by_email.remove(&e)).collect())
    }

    /// Every task and subtask of the owner assigned to one email
    pub async fn delegate_details(&self, owner: Id, delegate_email: &str) -> VaResult<DelegateDetails> {
        let email = delegate_email.trim().to_lowercase();
        if email.is_empty() {
            return Err(VaError::bad_request("Invalid delegate email"));
        }

        let tasks = self.ctx.stores.tasks.list_by_delegate_email(&email).await?;
        let mut assignments = Vec::new();
        for task in tasks.iter().filter(|t| t.is_owned_by(owner)) {
            if let Some(d) = task.delegate.iter().find(|d| d.matches_email(&email)) {
                assignments.push(Assignment {
                    id: task.id,
                    title: task.title.clone(),
                    status: task.status,
                    due_date: task.due_date,
                    kind: "task",
                    delegate_name: d.name.clone(),
                    parent_task_id: None,
                    parent_task: None,
                });
            }
            for sub in &task.sub_tasks {
                if let Some(d) = sub.delegate.iter().find(|d| d.matches_email(&email)) {
                    assignments.push(Assignment {
                        id: sub.id,
                        title: sub.title.clone(),
                        status: sub.status,
                        due_date: sub.due_date,
                        kind: "subtask",
                        delegate_name: d.name.clone(),
                        parent_task_id: Some(task.id),
                        parent_task: Some(task.title.clone()),
                    });
                }
            }
        }
        if assignments.is_empty() {
            return Err(VaError::not_found("No tasks found for the specified delegate email"));
        }

        let now = Utc::now();
        let count = |pred: &dyn Fn(&Assignment) -> bool| assignments.iter().filter(|a| pred(a)).count();
        Ok(DelegateDetails {
            delegate_name: assignments.iter().find_map(|a| a.delegate_name.clone()),
            delegate_email: email.clone(),
            total_pending: count(&|a| a.status == TaskStatus::Pending),
            total_completed: count(&|a| a.status.is_completed()),
            total_overdue: count(&|a| a.due_date < now && !a.status.is_completed()),
            assignments,
        })
    }

    /// Delegates whose task or subtask matches the filter; later matches replace earlier ones
    pub async fn delegates_by_status(
        &self,
        owner: Id,
        filter: DelegateStatusFilter,
    ) -> VaResult<Vec<DelegateWork>> {
        let tasks = self.ctx.stores.tasks.list_owned(owner).await?;
        let now = Utc::now();

        let mut order: Vec<String> = Vec::new();
        let mut by_email: HashMap<String, DelegateWork> = HashMap::new();
        let mut record = |delegates: &[Delegate], item: WorkItem| {
            for d in delegates {
                let email = d.email.to_lowercase();
                if !by_email.contains_key(&email) {
                    order.push(email.clone());
                }
                by_email.insert(
                    email.clone(),
                    DelegateWork {
                        name: d.name.clone(),
                        email,
                        task: item.clone(),
                    },
                );
            }
        };

        for task in tasks {
            if filter.matches(task.status, task.due_date, now) {
                record(&task.delegate, WorkItem::Task(task.clone()));
            }
            for sub in &task.sub_tasks {
                if filter.matches(sub.status, sub.due_date, now) {
                    record(&sub.delegate, WorkItem::Subtask(sub.clone()));
                }
            }
        }
        Ok(order.into_iter().filter_map(|e| by_email.remove(&e)).collect())
    }

    /// Owner's tasks where the email is a main delegate
    pub async fn delegate_tasks(&self, owner: Id, delegate_email: &str) -> VaResult<DelegateTasks> {
        let email = delegate_email.trim().to_lowercase();
        let all: Vec<Task> = self
            .ctx
            .stores
            .tasks
            .list_owned(owner)
            .await?
            .into_iter()
            .filter(|t| !email.is_empty() && t.has_delegate_email(&email))
            .collect();
        if all.is_empty() {
            return Err(VaError::not_found("No tasks found for the specified delegate email"));
        }

        let now = Utc::now();
        let pick = |pred: &dyn Fn(&Task) -> bool| all.iter().filter(|t| pred(t)).cloned().collect::<Vec<_>>();
        Ok(DelegateTasks {
            pending: pick(&|t| t.status == TaskStatus::Pending),
            completed: pick(&|t| t.status.is_completed()),
            overdue: pick(&|t| t.is_overdue(now)),
            all,
        })
    }

    /// Free-form email from the owner to one of their delegates; returns the recipient
    pub async fn message_delegate(&self, owner: Id, input: DelegateMessageInput) -> VaResult<String> {
        DelegateMessageContract.validate(&input)?;
        let email = input.delegate_email.unwrap_or_default().trim().to_lowercase();

        let sender = self
            .ctx
            .stores
            .users
            .find_by_id(owner)
            .await?
            .ok_or_else(|| VaError::not_found("Sender not found"))?;

        let known = self
            .ctx
            .stores
            .tasks
            .list_by_delegate_email(&email)
            .await?
            .iter()
            .any(|t| t.is_owned_by(owner));
        if !known {
            return Err(VaError::not_found(
                "This delegate is not associated with any of your tasks",
            ));
        }

        let message = self.ctx.templates.delegate_message(
            &email,
            &sender.full_name,
            input.subject.as_deref().unwrap_or_default(),
            input.message.as_deref().unwrap_or_default(),
        );
        self.ctx.deliver_strict(&message).await?;
        tracing::info!(%owner, to = %email, "Delegate message sent");
        Ok(email)
    }

    /// Remind the delegates of one subtask; returns how many were emailed
    pub async fn message_subtask_delegates(
        &self,
        owner: Id,
        subtask_id: Id,
        input: SubtaskMessageInput,
    ) -> VaResult<usize> {
        SubtaskMessageContract.validate(&input)?;
        let parent = self
            .ctx
            .stores
            .tasks
            .find_by_subtask_id(subtask_id)
            .await?
            .filter(|t| t.is_owned_by(owner))
            .ok_or_else(|| {
                VaError::forbidden("You are not authorized to access this subtask or it does not exist.")
            })?;
        let Some(subtask) = parent.subtask(subtask_id) else {
            return Err(VaError::forbidden(
                "You are not authorized to access this subtask or it does not exist.",
            ));
        };
        if subtask.delegate.is_empty() {
            return Err(VaError::not_found("No delegates found for this subtask"));
        }

        let by_name = input.delegate_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let by_email = input.delegate_email.as_deref().map(str::trim).filter(|e| !e.is_empty());
        let recipients: Vec<&Delegate> = match (by_name, by_email) {
            (None, None) => subtask.delegate.iter().collect(),
            _ => subtask
                .delegate
                .iter()
                .filter(|d| {
                    by_email.is_some_and(|e| d.matches_email(e))
                        || by_name.is_some_and(|n| {
                            d.name.as_deref().is_some_and(|name| name.eq_ignore_ascii_case(n))
                        })
                })
                .collect(),
        };
        if recipients.is_empty() {
            return Err(VaError::not_found("Delegate not found with provided name or email"));
        }

        let sender = self.ctx.current_user(owner).await?;
        let body = input.message.unwrap_or_default();
        for delegate in &recipients {
            let message = self.ctx.templates.subtask_reminder(
                &delegate.email,
                delegate.name.as_deref(),
                &subtask.title,
                &body,
                &sender.full_name,
            );
            self.ctx.deliver_strict(&message).await?;
        }
        Ok(recipients.len())
    }

    /// Status change by a registered main delegate
    pub async fn update_status_as_delegate(
        &self,
        user_id: Id,
        task_id: Id,
        input: StatusInput,
    ) -> VaResult<Task> {
        StatusContract.validate(&input)?;
        let mut task = self
            .ctx
            .stores
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| VaError::not_found("Task not found"))?;
        if !task.has_delegate_user(user_id) {
            return Err(VaError::forbidden("You are not authorized to update this task's status"));
        }
        task.status = parse_status(input.status.as_deref())?;
        task.updated_at = Utc::now();
        Ok(self.ctx.stores.tasks.update(&task).await?)
    }

    /// Status change by a registered subtask delegate; returns the updated subtask
    pub async fn update_subtask_status_as_delegate(
        &self,
        user_id: Id,
        subtask_id: Id,
        input: StatusInput,
    ) -> VaResult<Subtask> {
        StatusContract.validate(&input)?;
        let status = parse_status(input.status.as_deref())?;
        let mut task = self
            .ctx
            .stores
            .tasks
            .find_by_subtask_id(subtask_id)
            .await?
            .ok_or_else(|| VaError::not_found("Task or subtask not found"))?;
        let subtask = task
            .subtask_mut(subtask_id)
            .ok_or_else(|| VaError::not_found("Task or subtask not found"))?;
        if !subtask.has_delegate_user(user_id) {
            return Err(VaError::forbidden(
                "You are not authorized to update this subtask's status",
            ));
        }
        subtask.status = status;
        let updated = subtask.clone();
        task.updated_at = Utc::now();
        self.ctx.stores.tasks.update(&task).await?;
        Ok(updated)
    }

    /// Status change from the delegate's smart space, matched by the caller's email
    pub async fn update_status_by_email(
        &self,
        user_id: Id,
        task_id: Id,
        input: DelegateStatusInput,
    ) -> VaResult<Task> {
        StatusContract.validate(&input)?;
        let status = parse_status(input.status.as_deref())?;
        let user = self.ctx.current_user(user_id).await?;
        let mut task = self
            .ctx
            .stores
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| VaError::not_found("Task not found"))?;

        if input.is_subtask {
            let subtask_id = input
                .subtask_id
                .as_deref()
                .and_then(|raw| raw.trim().parse::<Id>().ok())
                .ok_or_else(|| VaError::bad_request("Subtask ID is required"))?;
            let subtask = task
                .subtask_mut(subtask_id)
                .filter(|s| s.has_delegate_email(&user.email))
                .ok_or_else(|| VaError::forbidden("You are not assigned to this subtask"))?;
            subtask.status = status;
        } else {
            if !task.has_delegate_email(&user.email) {
                return Err(VaError::forbidden("You are not assigned to this task"));
            }
            task.status = status;
        }
        task.updated_at = Utc::now();
        Ok(self.ctx.stores.tasks.update(&task).await?)
    }

    /// Subtasks assigned to the caller by id or email, grouped by parent task
    pub async fn subtasks_for_delegate(&self, user_id: Id) -> VaResult<Vec<DelegateSubtasks>> {
        let user = self.ctx.current_user(user_id).await?;
        let tasks = self
            .ctx
            .stores
            .tasks
            .list_involving(user_id, &user.email)
            .await?;
        Ok(tasks
            .into_iter()
            .filter_map(|task| {
                let subtasks: Vec<Subtask> = task
                    .sub_tasks
                    .into_iter()
                    .filter(|s| s.has_delegate_user(user_id) || s.has_delegate_email(&user.email))
                    .collect();
                (!subtasks.is_empty()).then(|| DelegateSubtasks {
                    task_id: task.id,
                    task_title: task.title,
                    subtasks,
                })
            })
            .collect())
    }
}

fn parse_status(raw: Option<&str>) -> VaResult<TaskStatus> {
    let raw = raw.unwrap_or_default();
    raw.parse()
        .map_err(|_| VaError::invalid(format!("Invalid status: {}", raw)))
}
