//! Shared service dependencies and side-effect dispatch

use std::sync::Arc;

use va_auth::JwtService;
use va_core::config::{AppConfig, AuthConfig};
use va_core::{Id, VaError, VaResult};
use va_db::Stores;
use va_models::{Notification, User};
use va_notifications::{
    EmailAddress, EmailMessage, EmailSender, EmailTemplates, Job, JobQueue, NotificationHub,
    PushMessage,
};

/// Everything a service needs, cheap to clone
#[derive(Clone)]
pub struct ServiceContext {
    pub stores: Stores,
    pub email: Arc<dyn EmailSender>,
    pub templates: Arc<EmailTemplates>,
    pub jobs: Arc<dyn JobQueue>,
    pub hub: Arc<NotificationHub>,
    pub jwt: Arc<JwtService>,
    pub auth: AuthConfig,
    queue: String,
}

impl ServiceContext {
    pub fn new(
        config: &AppConfig,
        stores: Stores,
        email: Arc<dyn EmailSender>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        let from = EmailAddress::new(config.email.from_address.clone())
            .with_name(config.email.from_name.clone());
        Self {
            stores,
            email,
            templates: Arc::new(EmailTemplates::new(from, config.frontend.primary_url())),
            jobs,
            hub: Arc::new(NotificationHub::new()),
            jwt: Arc::new(JwtService::new(config.auth.jwt_secret.as_bytes())),
            auth: config.auth.clone(),
            queue: config.jobs.queue.clone(),
        }
    }

    /// Load the acting user or fail with 404
    pub async fn current_user(&self, user_id: Id) -> VaResult<User> {
        self.stores
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| VaError::not_found("User not found"))
    }

    /// Send an email, logging instead of failing
    pub async fn deliver(&self, message: EmailMessage) {
        if let Err(e) = self.email.send(&message).await {
            tracing::warn!(
                error = %e,
                subject = %message.subject,
                to = ?message.to.iter().map(|a| a.email.as_str()).collect::<Vec<_>>(),
                "Email delivery failed"
            );
        }
    }

    /// Send an email and surface provider failures to the caller
    pub async fn deliver_strict(&self, message: &EmailMessage) -> VaResult<()> {
        self.email.send(message).await.map_err(|e| {
            tracing::error!(error = %e, subject = %message.subject, "Email delivery failed");
            VaError::from(e)
        })?;
        Ok(())
    }

    /// Store a notification for the user and push it to their open sockets
    pub async fn notify(&self, user_id: Id, message: impl Into<String>) {
        let message = message.into();
        match self
            .stores
            .notifications
            .insert(Notification::new(user_id, message.clone()))
            .await
        {
            Ok(_) => {
                let delivered = self.hub.push(user_id, PushMessage::notification(message));
                tracing::debug!(%user_id, delivered, "Notification pushed");
            }
            Err(e) => tracing::warn!(error = %e, %user_id, "Failed to store notification"),
        }
    }

    /// Enqueue a job on the configured queue, logging instead of failing
    pub async fn schedule(&self, job: Job) {
        let job = job.queue(self.queue.clone());
        let job_type = job.job_type.clone();
        let run_at = job.run_at;
        match self.jobs.enqueue(job).await {
            Ok(id) => tracing::debug!(job_id = %id, %job_type, %run_at, "Job scheduled"),
            Err(e) => tracing::warn!(error = %e, %job_type, "Failed to schedule job"),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue
    }
}
