//! Email delivery
//!
//! Messages are built by [`crate::templates::EmailTemplates`] and handed to
//! whichever [`EmailSender`] the configuration selects.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use va_core::VaError;

/// Email errors
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    /// The provider answered with a non-success status
    #[error("Email provider error ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type EmailResult<T> = Result<T, EmailError>;

impl From<EmailError> for VaError {
    fn from(err: EmailError) -> Self {
        let status = match &err {
            EmailError::Provider { status, .. } => Some(*status),
            EmailError::RateLimited { .. } => Some(429),
            _ => None,
        };
        let message = match status {
            Some(401) | Some(403) => "Email service authentication failed. Contact support.".to_string(),
            Some(429) => "Too many emails sent. Please try again later.".to_string(),
            _ => err.to_string(),
        };
        VaError::ExternalService {
            service: "email".to_string(),
            status,
            message,
        }
    }
}

/// Email address with optional name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email: String,
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Format as RFC 5322
    pub fn to_rfc5322(&self) -> String {
        match &self.name {
            Some(name) => format!("\"{}\" <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Email message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub reply_to: Option<EmailAddress>,
    pub subject: String,
    /// Plain text body
    pub text_body: String,
    pub html_body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EmailMessage {
    pub fn new(
        from: EmailAddress,
        to: Vec<EmailAddress>,
        subject: impl Into<String>,
        text_body: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from,
            to,
            reply_to: None,
            subject: subject.into(),
            text_body: text_body.into(),
            html_body: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    pub fn reply_to(mut self, address: EmailAddress) -> Self {
        self.reply_to = Some(address);
        self
    }

    /// Replace the display name on the sender, keeping the address
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from.name = Some(name.into());
        self
    }

    fn recipients(&self) -> String {
        self.to
            .iter()
            .map(EmailAddress::to_rfc5322)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Email sender trait
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send an email, returning the provider's message id
    async fn send(&self, message: &EmailMessage) -> EmailResult<String>;

    /// Check if the sender is configured
    fn is_configured(&self) -> bool;
}

/// Logs messages instead of delivering them (development)
#[derive(Debug, Default)]
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for ConsoleEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        if message.to.is_empty() {
            return Err(EmailError::InvalidRecipient("no recipients".into()));
        }
        tracing::info!(
            id = %message.id,
            from = %message.from.to_rfc5322(),
            to = %message.recipients(),
            subject = %message.subject,
            "Email (console delivery)"
        );
        tracing::debug!(body = %message.text_body, "Email body");

        Ok(message.id.clone())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Keeps every message in memory (tests)
#[derive(Debug, Default)]
pub struct MemoryEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
    fail_with: Mutex<Option<u16>>,
}

impl MemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages addressed to `email`
    pub fn sent_to(&self, email: &str) -> Vec<EmailMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.to.iter().any(|a| a.email.eq_ignore_ascii_case(email)))
            .collect()
    }

    /// Make subsequent sends fail as if the provider answered `status`
    pub fn fail_with(&self, status: Option<u16>) {
        if let Ok(mut slot) = self.fail_with.lock() {
            *slot = status;
        }
    }
}

#[async_trait]
impl EmailSender for MemoryEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        let failure = self.fail_with.lock().ok().and_then(|s| *s);
        if let Some(status) = failure {
            return Err(EmailError::Provider {
                status,
                message: "simulated failure".into(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(message.id.clone())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_address_format() {
        let addr = EmailAddress::new("va@example.com").with_name("SmartVA");
        assert_eq!(addr.to_rfc5322(), "\"SmartVA\" <va@example.com>");

        let addr = EmailAddress::new("no-name@example.com");
        assert_eq!(addr.to_rfc5322(), "no-name@example.com");
    }

    #[test]
    fn test_provider_errors_map_to_api_errors() {
        let err: VaError = EmailError::Provider {
            status: 403,
            message: "bad key".into(),
        }
        .into();
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.to_string(), "External service error: email - Email service authentication failed. Contact support.");

        let err: VaError = EmailError::RateLimited { retry_after_secs: 60 }.into();
        assert_eq!(err.status_code(), 429);

        let err: VaError = EmailError::SendFailed("boom".into()).into();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_console_sender() {
        let sender = ConsoleEmailSender::new();
        let message = EmailMessage::new(
            EmailAddress::new("va@example.com"),
            vec![EmailAddress::new("user@example.com")],
            "Test",
            "Body",
        );
        assert!(sender.send(&message).await.is_ok());

        let empty = EmailMessage::new(EmailAddress::new("va@example.com"), vec![], "Test", "Body");
        assert!(sender.send(&empty).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_sender_records_and_fails() {
        let sender = MemoryEmailSender::new();
        let message = EmailMessage::new(
            EmailAddress::new("va@example.com"),
            vec![EmailAddress::new("User@Example.com")],
            "Hello",
            "Body",
        );
        sender.send(&message).await.unwrap();
        assert_eq!(sender.sent_to("user@example.com").len(), 1);

        sender.fail_with(Some(429));
        assert!(matches!(
            sender.send(&message).await,
            Err(EmailError::Provider { status: 429, .. })
        ));
    }
}
