//! Background job handlers
//!
//! Each scheduled job type maps to one handler here. Handlers re-check the
//! world when they run: an event deleted or moved since scheduling turns the
//! job into a no-op instead of an error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use va_notifications::jobs::{
    CREATE_EVENT_NOTIFICATION, CREATE_REMINDER_NOTIFICATION, DELETE_EXPIRED_EVENT,
    PURGE_EXPIRED_VISITORS, SEND_EMAIL_REMINDER,
};
use va_notifications::{
    EmailReminderArgs, ExpiredEventArgs, Job, JobError, JobHandler, JobResult, JobWorker,
    NotificationArgs,
};

use crate::context::ServiceContext;
use crate::visitors::VisitorService;

/// Seconds between visitor retention sweeps
pub const VISITOR_PURGE_INTERVAL_SECS: i64 = 24 * 60 * 60;

fn failed(e: impl std::fmt::Display) -> JobError {
    JobError::Failed(e.to_string())
}

struct EmailReminderHandler {
    ctx: ServiceContext,
}

#[async_trait]
impl JobHandler for EmailReminderHandler {
    async fn handle(&self, job: &Job) -> JobResult<()> {
        let args: EmailReminderArgs = job.parse_args()?;
        let event = self.ctx.stores.events.find_by_id(args.event_id).await.map_err(failed)?;
        let Some(event) = event.filter(|e| !e.has_ended(Utc::now())) else {
            tracing::debug!(event_id = %args.event_id, "Reminder skipped, event gone or over");
            return Ok(());
        };
        let message = self
            .ctx
            .templates
            .event_reminder(&args.email, args.name.as_deref(), &event);
        self.ctx.email.send(&message).await.map_err(failed)?;
        tracing::info!(event_id = %event.id, to = %args.email, "Event reminder sent");
        Ok(())
    }
}

/// Shared by the reminder and task-due notification jobs
struct NotificationHandler {
    ctx: ServiceContext,
}

#[async_trait]
impl JobHandler for NotificationHandler {
    async fn handle(&self, job: &Job) -> JobResult<()> {
        let args: NotificationArgs = job.parse_args()?;
        self.ctx.notify(args.user_id, args.message).await;
        Ok(())
    }
}

struct ExpiredEventHandler {
    ctx: ServiceContext,
}

#[async_trait]
impl JobHandler for ExpiredEventHandler {
    async fn handle(&self, job: &Job) -> JobResult<()> {
        let args: ExpiredEventArgs = job.parse_args()?;
        let stores = &self.ctx.stores;
        let Some(event) = stores.events.find_by_id(args.event_id).await.map_err(failed)? else {
            return Ok(());
        };
        // The end may have moved; a later job covers the new end time.
        if !event.has_ended(Utc::now()) {
            return Ok(());
        }
        stores.events.delete(event.id).await.map_err(failed)?;
        stores.busy_times.delete_for_event(event.id).await.map_err(failed)?;
        tracing::info!(event_id = %event.id, "Expired event removed");
        Ok(())
    }
}

struct VisitorPurgeHandler {
    visitors: VisitorService,
}

#[async_trait]
impl JobHandler for VisitorPurgeHandler {
    async fn handle(&self, _job: &Job) -> JobResult<()> {
        self.visitors.purge_expired(Utc::now()).await.map_err(failed)?;
        Ok(())
    }
}

/// Wire every job type the services schedule into `worker`
pub fn register_job_handlers(worker: &mut JobWorker, ctx: &ServiceContext) {
    let notifications = Arc::new(NotificationHandler { ctx: ctx.clone() });
    worker.register(SEND_EMAIL_REMINDER, Arc::new(EmailReminderHandler { ctx: ctx.clone() }));
    worker.register(CREATE_REMINDER_NOTIFICATION, notifications.clone());
    worker.register(CREATE_EVENT_NOTIFICATION, notifications);
    worker.register(DELETE_EXPIRED_EVENT, Arc::new(ExpiredEventHandler { ctx: ctx.clone() }));
    worker.register(
        PURGE_EXPIRED_VISITORS,
        Arc::new(VisitorPurgeHandler {
            visitors: VisitorService::new(ctx.clone()),
        }),
    );
}

/// The recurring retention sweep, for `JobQueue::ensure_recurring`
pub fn visitor_purge_job(queue: &str) -> Job {
    Job::new(PURGE_EXPIRED_VISITORS, serde_json::json!({}))
        .queue(queue)
        .repeat_every(VISITOR_PURGE_INTERVAL_SECS)
}
