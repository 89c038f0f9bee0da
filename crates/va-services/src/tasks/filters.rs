//! Owner-scoped task filters

use chrono::{DateTime, Duration, NaiveDate, Utc};
use va_core::types::day_bounds;
use va_core::{Id, VaError, VaResult};
use va_models::{Priority, Task, TaskStatus};

use super::TaskService;

/// A predicate over the owner's tasks
#[derive(Debug, Clone, PartialEq)]
pub enum TaskFilter {
    Status(TaskStatus),
    Priority(Priority),
    /// Main delegate name or email, case-insensitive
    Delegate(String),
    /// Due on this UTC calendar day
    DueDate(NaiveDate),
    Pending,
    Completed,
    Overdue,
    DueWithin72Hours,
    /// High priority, due within a day and not completed
    Emergency,
}

impl TaskFilter {
    pub fn status(raw: &str) -> VaResult<Self> {
        raw.parse()
            .map(TaskFilter::Status)
            .map_err(|e| VaError::bad_request(e.to_string()))
    }

    pub fn priority(raw: &str) -> VaResult<Self> {
        raw.parse()
            .map(TaskFilter::Priority)
            .map_err(|e| VaError::bad_request(e.to_string()))
    }

    pub fn due_date(raw: &str) -> VaResult<Self> {
        va_core::types::parse_datetime(raw)
            .map(|at| TaskFilter::DueDate(at.date_naive()))
            .ok_or_else(|| VaError::bad_request("Invalid due date"))
    }

    /// Used in `"<label> tasks retrieved successfully"`
    pub fn label(&self) -> &'static str {
        match self {
            TaskFilter::Status(_) => "Status",
            TaskFilter::Priority(_) => "Priority",
            TaskFilter::Delegate(_) => "Delegate",
            TaskFilter::DueDate(_) => "Due date",
            TaskFilter::Pending => "Pending",
            TaskFilter::Completed => "Completed",
            TaskFilter::Overdue => "Overdue",
            TaskFilter::DueWithin72Hours => "Due in the next 72 hours",
            TaskFilter::Emergency => "Emergency",
        }
    }

    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            TaskFilter::Status(status) => task.status == *status,
            TaskFilter::Priority(priority) => task.priority == *priority,
            TaskFilter::Delegate(needle) => {
                let needle = needle.trim();
                task.delegate.iter().any(|d| {
                    d.matches_email(needle)
                        || d.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(needle))
                })
            }
            TaskFilter::DueDate(day) => {
                let (start, end) = day_bounds(*day);
                task.due_date >= start && task.due_date < end
            }
            TaskFilter::Pending => task.status == TaskStatus::Pending,
            TaskFilter::Completed => task.status.is_completed(),
            TaskFilter::Overdue => task.is_overdue(now),
            TaskFilter::DueWithin72Hours => {
                task.due_date >= now && task.due_date <= now + Duration::hours(72)
            }
            TaskFilter::Emergency => {
                task.priority == Priority::High
                    && task.due_date < now + Duration::hours(24)
                    && !task.status.is_completed()
            }
        }
    }
}

impl TaskService {
    pub async fn filter(&self, owner: Id, filter: &TaskFilter) -> VaResult<Vec<Task>> {
        let now = Utc::now();
        let tasks = self.ctx.stores.tasks.list_owned(owner).await?;
        tracing::debug!(%owner, filter = filter.label(), "Filtering tasks");
        Ok(tasks.into_iter().filter(|t| filter.matches(t, now)).collect())
    }
}
