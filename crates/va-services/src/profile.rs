//! Delegate-facing "smart space"
//!
//! A delegate sees the work handed to them grouped by who supervises it,
//! the events they were invited to, and can move their own assignments
//! along without owning the parent task.

use serde::Serialize;
use va_contracts::tasks::DelegateStatusInput;
use va_core::{Id, VaError, VaResult};
use va_models::{Task, UserSummary};

use crate::context::ServiceContext;
use crate::events::{EventService, MemberEvents};
use crate::tasks::TaskService;

/// Tasks for one delegate email sharing the same supervisor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorGroup {
    pub supervisor_id: Id,
    pub total_tasks: usize,
    pub supervisor: Option<UserSummary>,
    pub tasks: Vec<Task>,
}

/// The first registered main delegate supervises; otherwise the owner does
fn supervisor_of(task: &Task) -> Id {
    task.delegate
        .iter()
        .find_map(|d| d.user_id)
        .unwrap_or(task.user_id)
}

pub struct ProfileService {
    ctx: ServiceContext,
}

impl ProfileService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn supervisors(&self, email: &str) -> VaResult<Vec<SupervisorGroup>> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(VaError::bad_request("Email is required"));
        }
        let tasks = self.ctx.stores.tasks.list_by_delegate_email(&email).await?;

        let mut groups: Vec<SupervisorGroup> = Vec::new();
        for task in tasks {
            let supervisor_id = supervisor_of(&task);
            match groups.iter_mut().find(|g| g.supervisor_id == supervisor_id) {
                Some(group) => group.tasks.push(task),
                None => groups.push(SupervisorGroup {
                    supervisor_id,
                    total_tasks: 0,
                    supervisor: None,
                    tasks: vec![task],
                }),
            }
        }

        let ids: Vec<Id> = groups.iter().map(|g| g.supervisor_id).collect();
        let users = self.ctx.stores.users.find_by_ids(&ids).await?;
        for group in &mut groups {
            group.total_tasks = group.tasks.len();
            group.supervisor = users
                .iter()
                .find(|u| u.id == group.supervisor_id)
                .map(|u| u.summary());
        }
        Ok(groups)
    }

    pub async fn update_status(
        &self,
        user_id: Id,
        task_id: Id,
        input: DelegateStatusInput,
    ) -> VaResult<Task> {
        TaskService::new(self.ctx.clone())
            .update_status_by_email(user_id, task_id, input)
            .await
    }

    pub async fn member_events(&self, user_id: Id) -> VaResult<MemberEvents> {
        EventService::new(self.ctx.clone()).member_events(user_id).await
    }

    pub async fn delete_notification(&self, user_id: Id, id: Id) -> VaResult<()> {
        if !self.ctx.stores.notifications.delete_owned(id, user_id).await? {
            return Err(VaError::not_found("Notification not found or not authorized"));
        }
        Ok(())
    }
}
