//! Resend HTTP API sender

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::email::{EmailError, EmailMessage, EmailResult, EmailSender};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: String,
    to: Vec<&'a str>,
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Sends through `POST https://api.resend.com/emails`
pub struct ResendEmailSender {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl ResendEmailSender {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: RESEND_API_URL.to_string(),
        }
    }
}

/// Map a provider response onto [`EmailError`]
async fn check_response(resp: reqwest::Response) -> EmailResult<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(EmailError::RateLimited { retry_after_secs });
    }
    if !status.is_success() {
        return Err(EmailError::Provider {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        if message.to.is_empty() {
            return Err(EmailError::InvalidRecipient("no recipients".into()));
        }
        let body = SendRequest {
            from: message.from.to_rfc5322(),
            to: message.to.iter().map(|a| a.email.as_str()).collect(),
            subject: &message.subject,
            html: message.html_body.as_deref(),
            text: &message.text_body,
            reply_to: message.reply_to.as_ref().map(|a| a.email.as_str()),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let sent: SendResponse = resp.json().await?;

        tracing::debug!(id = %sent.id, subject = %message.subject, "Email accepted by Resend");
        Ok(sent.id)
    }

    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::EmailAddress;

    #[test]
    fn test_request_shape() {
        let message = EmailMessage::new(
            EmailAddress::new("noreply@smartva.app").with_name("SmartVA"),
            vec![EmailAddress::new("a@example.com")],
            "Hi",
            "Body",
        )
        .with_html("<p>Body</p>");
        let body = SendRequest {
            from: message.from.to_rfc5322(),
            to: message.to.iter().map(|a| a.email.as_str()).collect(),
            subject: &message.subject,
            html: message.html_body.as_deref(),
            text: &message.text_body,
            reply_to: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["from"], "\"SmartVA\" <noreply@smartva.app>");
        assert_eq!(json["to"][0], "a@example.com");
        assert!(json.get("reply_to").is_none());
    }

    #[test]
    fn test_is_configured() {
        assert!(ResendEmailSender::new("re_123").is_configured());
        assert!(!ResendEmailSender::new("  ").is_configured());
    }
}
