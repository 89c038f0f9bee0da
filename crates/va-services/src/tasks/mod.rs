//! Tasks with delegation
//!
//! The owner creates and edits a task; delegates (registered users or plain
//! email addresses) are told about assignments and changes. Subtasks live
//! inside their task and carry their own delegates.

mod delegates;
mod filters;

use chrono::{DateTime, Duration, Utc};
use va_contracts::tasks::{
    CreateTaskContract, CreateTaskInput, SubtaskInput, UpdateTaskContract, UpdateTaskInput,
};
use va_contracts::Contract;
use va_core::types::parse_datetime;
use va_core::{Id, Owned, Page, PageParams, VaError, VaResult};
use va_models::{Delegate, Priority, Subtask, Task, TaskStatus};
use va_notifications::jobs::CREATE_EVENT_NOTIFICATION;
use va_notifications::{Job, NotificationArgs};

use crate::context::ServiceContext;

pub use delegates::{
    Assignment, DelegateDetails, DelegateStatusFilter, DelegateSubtasks, DelegateSummary,
    DelegateTasks, DelegateWork, WorkItem,
};
pub use filters::TaskFilter;

/// Default page size for task listings
pub const DEFAULT_TASK_PAGE_SIZE: i64 = 10;

/// A task id resolved either to a task or to one of its subtasks
#[derive(Debug, Clone)]
pub enum TaskLookup {
    Task(Task),
    Subtask { parent_task_id: Id, subtask: Subtask },
}

/// Result of `mark-completed`
#[derive(Debug, Clone)]
pub enum Completion {
    Completed(Task),
    AlreadyCompleted { task: Task, is_subtask: bool },
}

impl Completion {
    pub fn message(&self) -> &'static str {
        match self {
            Completion::Completed(_) => "Marked as completed successfully",
            Completion::AlreadyCompleted { is_subtask: false, .. } => "Task is already completed",
            Completion::AlreadyCompleted { is_subtask: true, .. } => "Subtask is already completed",
        }
    }

    pub fn task(&self) -> &Task {
        match self {
            Completion::Completed(task) | Completion::AlreadyCompleted { task, .. } => task,
        }
    }
}

/// What `DELETE /task/:id` removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Task,
    Subtask,
}

impl Deletion {
    pub fn message(&self) -> &'static str {
        match self {
            Deletion::Task => "Main task deleted successfully",
            Deletion::Subtask => "Subtask deleted successfully",
        }
    }
}

fn parse_due(raw: Option<&str>) -> VaResult<DateTime<Utc>> {
    raw.and_then(parse_datetime)
        .ok_or_else(|| VaError::invalid("Invalid due date"))
}

fn parse_priority(raw: Option<&str>) -> VaResult<Priority> {
    match raw {
        None => Ok(Priority::default()),
        Some(p) => p.parse().map_err(|e| VaError::invalid(format!("{}", e))),
    }
}

fn parse_status(raw: Option<&str>) -> VaResult<TaskStatus> {
    match raw {
        None => Ok(TaskStatus::default()),
        Some(s) => s.parse().map_err(|e| VaError::invalid(format!("{}", e))),
    }
}

/// `1/5/2026` as used in assignment notifications
fn short_date(at: DateTime<Utc>) -> String {
    at.format("%-m/%-d/%Y").to_string()
}

pub struct TaskService {
    ctx: ServiceContext,
}

impl TaskService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    async fn new_subtask(&self, input: SubtaskInput) -> VaResult<Subtask> {
        if input.title.as_deref().map_or(true, |t| t.trim().is_empty())
            || input.description.as_deref().map_or(true, |d| d.trim().is_empty())
        {
            return Err(VaError::invalid("Subtask title, description and due date are required"));
        }
        Ok(Subtask {
            id: uuid::Uuid::new_v4(),
            title: input.title.unwrap_or_default().trim().to_string(),
            description: input.description.unwrap_or_default().trim().to_string(),
            due_date: parse_due(input.due_date.as_deref())?,
            delegate: delegates::normalize(&self.ctx, input.delegate).await?,
            priority: parse_priority(input.priority.as_deref())?,
            status: parse_status(input.status.as_deref())?,
        })
    }

    async fn merge_subtask(&self, mut subtask: Subtask, input: SubtaskInput) -> VaResult<Subtask> {
        if let Some(title) = input.title {
            subtask.title = title.trim().to_string();
        }
        if let Some(description) = input.description {
            subtask.description = description;
        }
        if let Some(due) = input.due_date {
            subtask.due_date = parse_due(Some(due.as_str()))?;
        }
        if input.delegate.is_some() {
            subtask.delegate = delegates::normalize(&self.ctx, input.delegate).await?;
        }
        if let Some(priority) = input.priority {
            subtask.priority = parse_priority(Some(priority.as_str()))?;
        }
        if let Some(status) = input.status {
            subtask.status = parse_status(Some(status.as_str()))?;
        }
        Ok(subtask)
    }

    /// Owned task or 404
    async fn owned_task(&self, owner: Id, task_id: Id) -> VaResult<Task> {
        self.ctx
            .stores
            .tasks
            .find_by_id(task_id)
            .await?
            .filter(|t| t.is_owned_by(owner))
            .ok_or_else(|| VaError::not_found("Task not found or not authorized"))
    }

    pub async fn create(&self, owner_id: Id, input: CreateTaskInput) -> VaResult<Task> {
        CreateTaskContract.validate(&input)?;
        let owner = self
            .ctx
            .stores
            .users
            .find_by_id(owner_id)
            .await?
            .ok_or_else(|| VaError::not_found("Assignee user not found"))?;

        let mut sub_tasks = Vec::new();
        for sub in input.sub_tasks.unwrap_or_default() {
            sub_tasks.push(self.new_subtask(sub).await?);
        }

        let now = Utc::now();
        let task = Task {
            id: uuid::Uuid::new_v4(),
            title: input.title.unwrap_or_default().trim().to_string(),
            description: input.description.unwrap_or_default().trim().to_string(),
            due_date: parse_due(input.due_date.as_deref())?,
            delegate: delegates::normalize(&self.ctx, input.delegate).await?,
            priority: parse_priority(input.priority.as_deref())?,
            status: parse_status(input.status.as_deref())?,
            user_id: owner_id,
            sub_tasks,
            created_at: now,
            updated_at: now,
        };
        let task = self.ctx.stores.tasks.insert(task).await?;
        tracing::info!(task_id = %task.id, owner = %owner_id, "Task created");

        self.announce_assignment(&task.delegate, &task.title, &task.description, task.due_date, &owner.full_name, false)
            .await;
        for sub in &task.sub_tasks {
            self.announce_assignment(&sub.delegate, &sub.title, &sub.description, sub.due_date, &owner.full_name, true)
                .await;
        }

        let remind_at = task.due_date - Duration::days(2);
        if remind_at > now {
            let args = NotificationArgs {
                user_id: owner_id,
                message: format!("Your task titled \"{}\" will be due in two days.", task.title),
            };
            match Job::with_args(CREATE_EVENT_NOTIFICATION, &args) {
                Ok(job) => self.ctx.schedule(job.run_at(remind_at)).await,
                Err(e) => tracing::warn!(error = %e, "Failed to build due-date reminder"),
            }
        }
        Ok(task)
    }

    async fn announce_assignment(
        &self,
        delegates: &[Delegate],
        title: &str,
        description: &str,
        due_date: DateTime<Utc>,
        assigned_by: &str,
        is_subtask: bool,
    ) {
        let kind = if is_subtask { "subtask" } else { "task" };
        for delegate in delegates {
            let message = self.ctx.templates.task_assigned(
                &delegate.email,
                delegate.name.as_deref(),
                title,
                description,
                due_date,
                assigned_by,
                is_subtask,
            );
            self.ctx.deliver(message).await;

            if let Some(user_id) = delegate.user_id {
                self.ctx
                    .notify(
                        user_id,
                        format!(
                            "You have been assigned a new {}: \"{}\" with due date {}.",
                            kind,
                            title,
                            short_date(due_date)
                        ),
                    )
                    .await;
            }
        }
    }

    /// Tasks the user owns or is a main delegate of
    pub async fn list(&self, user_id: Id, params: PageParams) -> VaResult<Page<Task>> {
        Ok(self.ctx.stores.tasks.page_visible(user_id, params).await?)
    }

    /// Text search over everything the user is involved in, newest first
    pub async fn search(&self, user_id: Id, needle: &str, params: PageParams) -> VaResult<Page<Task>> {
        let user = self.ctx.current_user(user_id).await?;
        let mut tasks: Vec<Task> = self
            .ctx
            .stores
            .tasks
            .list_involving(user_id, &user.email)
            .await?
            .into_iter()
            .filter(|t| t.involves_user(user_id) && t.matches_text(needle.trim()))
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_vec(tasks, params))
    }

    pub async fn get(&self, user_id: Id, task_id: Id) -> VaResult<TaskLookup> {
        let tasks = &self.ctx.stores.tasks;
        if let Some(task) = tasks.find_by_id(task_id).await? {
            if task.involves_user(user_id) {
                return Ok(TaskLookup::Task(task));
            }
        }
        if let Some(parent) = tasks.find_by_subtask_id(task_id).await? {
            if parent.involves_user(user_id) {
                if let Some(subtask) = parent.subtask(task_id).cloned() {
                    return Ok(TaskLookup::Subtask {
                        parent_task_id: parent.id,
                        subtask,
                    });
                }
            }
        }
        Err(VaError::not_found("Task or subtask not found or not authorized"))
    }

    pub async fn update(&self, owner: Id, task_id: Id, input: UpdateTaskInput) -> VaResult<Task> {
        UpdateTaskContract.validate(&input)?;
        let mut task = self.owned_task(owner, task_id).await?;
        let old_title = task.title.clone();

        if let Some(title) = input.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = input.description {
            task.description = description;
        }
        if let Some(due) = input.due_date {
            task.due_date = parse_due(Some(due.as_str()))?;
        }
        if input.delegate.is_some() {
            task.delegate = delegates::normalize(&self.ctx, input.delegate).await?;
        }
        if let Some(priority) = input.priority {
            task.priority = parse_priority(Some(priority.as_str()))?;
        }
        if let Some(status) = input.status {
            task.status = parse_status(Some(status.as_str()))?;
        }
        if let Some(subtasks) = input.sub_tasks {
            let mut merged = Vec::with_capacity(subtasks.len());
            for sub in subtasks {
                let existing = sub
                    .id
                    .as_deref()
                    .and_then(|raw| raw.parse::<Id>().ok())
                    .and_then(|id| task.subtask(id).cloned());
                merged.push(match existing {
                    Some(existing) => self.merge_subtask(existing, sub).await?,
                    None => self.new_subtask(sub).await?,
                });
            }
            task.sub_tasks = merged;
        }
        task.updated_at = Utc::now();

        let task = self.ctx.stores.tasks.update(&task).await?;
        self.announce_update(&task, &old_title).await;
        Ok(task)
    }

    /// Email main delegates, then subtask delegates that are not main delegates
    async fn announce_update(&self, task: &Task, old_title: &str) {
        let mut recipients: Vec<(&Delegate, &str, &str, DateTime<Utc>)> = task
            .delegate
            .iter()
            .map(|d| (d, task.title.as_str(), task.description.as_str(), task.due_date))
            .collect();
        for sub in &task.sub_tasks {
            for d in &sub.delegate {
                let seen = recipients.iter().any(|(r, ..)| r.matches_email(&d.email));
                if !seen {
                    recipients.push((d, sub.title.as_str(), sub.description.as_str(), sub.due_date));
                }
            }
        }

        let message = format!("Task \"{}\" has been updated. Please check the details.", old_title);
        for (delegate, title, description, due) in recipients {
            self.ctx
                .deliver(self.ctx.templates.task_updated(
                    &delegate.email,
                    delegate.name.as_deref(),
                    title,
                    description,
                    due,
                ))
                .await;
            if let Some(user_id) = delegate.user_id {
                self.ctx.notify(user_id, message.clone()).await;
            }
        }
    }

    pub async fn delete(&self, owner: Id, id: Id) -> VaResult<Deletion> {
        let tasks = &self.ctx.stores.tasks;
        if let Some(task) = tasks.find_by_id(id).await? {
            if task.is_owned_by(owner) && tasks.delete(id).await? {
                tracing::info!(task_id = %id, "Task deleted");
                return Ok(Deletion::Task);
            }
        }
        if let Some(mut parent) = tasks.find_by_subtask_id(id).await? {
            if parent.is_owned_by(owner) && parent.remove_subtask(id) {
                parent.updated_at = Utc::now();
                tasks.update(&parent).await?;
                return Ok(Deletion::Subtask);
            }
        }
        Err(VaError::not_found("Task or subtask not found"))
    }

    pub async fn mark_completed(&self, owner: Id, id: Id) -> VaResult<Completion> {
        let tasks = &self.ctx.stores.tasks;
        let (mut task, is_subtask) = match tasks.find_by_id(id).await? {
            Some(task) if task.is_owned_by(owner) => (task, false),
            _ => match tasks.find_by_subtask_id(id).await? {
                Some(parent) if parent.is_owned_by(owner) => (parent, true),
                _ => return Err(VaError::not_found("Task not found or not authorized")),
            },
        };

        let status = if is_subtask {
            task.subtask(id).map(|s| s.status).unwrap_or_default()
        } else {
            task.status
        };
        if status.is_completed() {
            return Ok(Completion::AlreadyCompleted { task, is_subtask });
        }
        match task.subtask_mut(id) {
            Some(sub) => sub.status = TaskStatus::Completed,
            None => task.status = TaskStatus::Completed,
        }
        task.updated_at = Utc::now();

        let task = tasks.update(&task).await?;
        Ok(Completion::Completed(task))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::TestContext;
    use serde_json::json;

    pub(crate) fn create_input(value: serde_json::Value) -> CreateTaskInput {
        serde_json::from_value(value).unwrap()
    }

    pub(crate) fn due_in(days: i64) -> String {
        (Utc::now() + Duration::days(days)).to_rfc3339()
    }

    #[tokio::test]
    async fn test_create_normalizes_and_notifies() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let bob = t.user("bob", "Bob Builder").await;
        let service = TaskService::new(t.ctx.clone());

        let task = service
            .create(
                owner.id,
                create_input(json!({
                    "title": "Quarterly report",
                    "description": "Compile numbers",
                    "dueDate": due_in(5),
                    "priority": "High",
                    "delegate": ["BOB@example.com", { "email": "jane.doe@partner.org" }],
                    "subTasks": [{
                        "title": "Collect invoices",
                        "description": "From finance",
                        "dueDate": due_in(3),
                        "delegate": "mary_ann@partner.org"
                    }]
                })),
            )
            .await
            .unwrap();

        assert_eq!(task.delegate[0].user_id, Some(bob.id));
        assert_eq!(task.delegate[0].name.as_deref(), Some("Bob Builder"));
        assert_eq!(task.delegate[1].name.as_deref(), Some("Jane Doe"));
        assert_eq!(task.sub_tasks[0].delegate[0].name.as_deref(), Some("Mary Ann"));

        assert_eq!(t.emails.sent_to("bob@example.com")[0].subject, "New Task Assigned: Quarterly report");
        assert_eq!(
            t.emails.sent_to("mary_ann@partner.org")[0].subject,
            "New Subtask Assigned: Collect invoices"
        );

        let notifications = t.ctx.stores.notifications.list_for_user(bob.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0]
            .message
            .starts_with("You have been assigned a new task: \"Quarterly report\" with due date"));

        let jobs = t.jobs.of_type(CREATE_EVENT_NOTIFICATION).await;
        assert_eq!(jobs.len(), 1);
        let args: NotificationArgs = jobs[0].parse_args().unwrap();
        assert_eq!(args.user_id, owner.id);
        assert_eq!(args.message, "Your task titled \"Quarterly report\" will be due in two days.");
    }

    #[tokio::test]
    async fn test_create_requires_fields_and_skips_near_reminder() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = TaskService::new(t.ctx.clone());

        let err = service
            .create(owner.id, create_input(json!({ "title": "Only title" })))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "All fields except subtasks are required");

        service
            .create(
                owner.id,
                create_input(json!({
                    "title": "Tomorrow", "description": "d", "dueDate": due_in(1),
                    "priority": "Low", "delegate": "x@example.com"
                })),
            )
            .await
            .unwrap();
        assert!(t.jobs.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_task_or_subtask() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let stranger = t.user("stranger", "Sam Stranger").await;
        let service = TaskService::new(t.ctx.clone());
        let task = service
            .create(
                owner.id,
                create_input(json!({
                    "title": "Plan offsite", "description": "d", "dueDate": due_in(10),
                    "priority": "Medium", "delegate": "x@example.com",
                    "subTasks": [{ "title": "Book venue", "description": "d", "dueDate": due_in(4) }]
                })),
            )
            .await
            .unwrap();

        assert!(matches!(service.get(owner.id, task.id).await.unwrap(), TaskLookup::Task(_)));
        match service.get(owner.id, task.sub_tasks[0].id).await.unwrap() {
            TaskLookup::Subtask { parent_task_id, subtask } => {
                assert_eq!(parent_task_id, task.id);
                assert_eq!(subtask.title, "Book venue");
            }
            other => panic!("expected subtask, got {:?}", other),
        }
        let err = service.get(stranger.id, task.id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_update_merges_subtasks_and_notifies() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let bob = t.user("bob", "Bob Builder").await;
        let service = TaskService::new(t.ctx.clone());
        let task = service
            .create(
                owner.id,
                create_input(json!({
                    "title": "Old title", "description": "d", "dueDate": due_in(10),
                    "priority": "Medium", "delegate": "bob@example.com",
                    "subTasks": [{ "title": "Step one", "description": "d", "dueDate": due_in(4),
                                   "delegate": "ext@example.com" }]
                })),
            )
            .await
            .unwrap();
        let sub_id = task.sub_tasks[0].id;

        let input: UpdateTaskInput = serde_json::from_value(json!({
            "title": "New title",
            "subTasks": [
                { "_id": sub_id.to_string(), "status": "In Progress" },
                { "title": "Step two", "description": "d", "dueDate": due_in(6) }
            ]
        }))
        .unwrap();
        let updated = service.update(owner.id, task.id, input).await.unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(updated.sub_tasks.len(), 2);
        assert_eq!(updated.sub_tasks[0].id, sub_id);
        assert_eq!(updated.sub_tasks[0].status, TaskStatus::InProgress);
        assert_eq!(updated.sub_tasks[0].delegate[0].email, "ext@example.com");

        let notes = t.ctx.stores.notifications.list_for_user(bob.id).await.unwrap();
        assert!(notes
            .iter()
            .any(|n| n.message == "Task \"Old title\" has been updated. Please check the details."));
        assert!(t
            .emails
            .sent_to("ext@example.com")
            .iter()
            .any(|m| m.subject == "Updated Task Details: Step one"));

        let err = service
            .update(bob.id, task.id, UpdateTaskInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Task not found or not authorized");
    }

    #[tokio::test]
    async fn test_mark_completed_and_delete() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = TaskService::new(t.ctx.clone());
        let task = service
            .create(
                owner.id,
                create_input(json!({
                    "title": "Finish", "description": "d", "dueDate": due_in(10),
                    "priority": "Medium", "delegate": "x@example.com",
                    "subTasks": [{ "title": "Part", "description": "d", "dueDate": due_in(4) }]
                })),
            )
            .await
            .unwrap();
        let sub_id = task.sub_tasks[0].id;

        let done = service.mark_completed(owner.id, sub_id).await.unwrap();
        assert_eq!(done.message(), "Marked as completed successfully");
        assert!(done.task().sub_tasks[0].status.is_completed());
        let again = service.mark_completed(owner.id, sub_id).await.unwrap();
        assert_eq!(again.message(), "Subtask is already completed");

        assert_eq!(service.delete(owner.id, sub_id).await.unwrap(), Deletion::Subtask);
        assert_eq!(service.delete(owner.id, task.id).await.unwrap(), Deletion::Task);
        assert_eq!(service.delete(owner.id, task.id).await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn test_search_and_list() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = TaskService::new(t.ctx.clone());
        for title in ["Budget review", "Team lunch", "Budget sign-off"] {
            service
                .create(
                    owner.id,
                    create_input(json!({
                        "title": title, "description": "d", "dueDate": due_in(10),
                        "priority": "Medium", "delegate": "x@example.com"
                    })),
                )
                .await
                .unwrap();
        }

        let page = service.search(owner.id, "budget", PageParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 2);

        let page = service.list(owner.id, PageParams::new(1, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages(), 2);
    }
}
