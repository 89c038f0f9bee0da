//! Email templates
//!
//! Every template produces a plain-text body plus a small inline-styled
//! HTML body.

use chrono::{DateTime, Utc};
use va_models::naming::{format_due_date, format_event_time};
use va_models::Event;

use crate::email::{EmailAddress, EmailMessage};

/// Builds the outgoing messages with a fixed sender identity
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    from: EmailAddress,
    app_url: String,
}

/// Minimal escaping for values interpolated into HTML bodies
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn greeting(name: Option<&str>) -> String {
    escape(name.filter(|n| !n.trim().is_empty()).unwrap_or("there"))
}

fn layout(accent: &str, heading: &str, inner: &str) -> String {
    format!(
        r#"<div style="background-color:#f9f9f9;padding:30px;font-family:Arial,sans-serif;color:#333;line-height:1.6;border-radius:8px;max-width:600px;margin:auto;border-left:6px solid {accent};">
  <h2 style="color:{accent};">{heading}</h2>
  {inner}
  <p style="margin-top:30px;">Best regards,<br/><strong>SmartVA Team</strong></p>
</div>"#
    )
}

fn rows(pairs: &[(&str, String)]) -> String {
    let body: String = pairs
        .iter()
        .map(|(label, value)| format!("<tr><td><strong>{}:</strong></td><td>{}</td></tr>", label, escape(value)))
        .collect();
    format!("<table cellpadding=\"6\">{}</table>", body)
}

fn time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{} → {}", format_event_time(start), format_event_time(end))
}

impl EmailTemplates {
    pub fn new(from: EmailAddress, app_url: impl Into<String>) -> Self {
        Self {
            from,
            app_url: app_url.into(),
        }
    }

    pub fn from_address(&self) -> &EmailAddress {
        &self.from
    }

    fn message(&self, to: &str, name: Option<&str>, subject: String, text: String, html: String) -> EmailMessage {
        let mut recipient = EmailAddress::new(to);
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            recipient = recipient.with_name(name);
        }
        EmailMessage::new(self.from.clone(), vec![recipient], subject, text).with_html(html)
    }

    fn code_block(code: &str) -> String {
        format!(
            r#"<div style="background-color:#e0f7e9;padding:15px;text-align:center;border-radius:5px;font-size:24px;font-weight:bold;letter-spacing:4px;margin:20px 0;">{}</div>"#,
            escape(code)
        )
    }

    pub fn verification_code(&self, to: &str, code: &str) -> EmailMessage {
        let text = format!(
            "Thank you for registering with SmartVA! Your verification code is {}. It expires in one hour.",
            code
        );
        let html = layout(
            "#4CAF50",
            "Email Verification",
            &format!(
                "<p>Thank you for registering with SmartVA! To complete your registration, use this six-digit code:</p>{}<p>If you did not request this verification, please ignore this email.</p>",
                Self::code_block(code)
            ),
        );
        self.message(to, None, "Verify your email".into(), text, html)
    }

    pub fn password_reset_code(&self, to: &str, code: &str) -> EmailMessage {
        let text = format!(
            "We received a request to reset your SmartVA password. Your reset code is {}. It expires in one hour.",
            code
        );
        let html = layout(
            "#4CAF50",
            "Password Reset Request",
            &format!(
                "<p>We received a request to reset your SmartVA account password. Use this six-digit code to proceed:</p>{}<p>If you did not request a password reset, please ignore this email.</p>",
                Self::code_block(code)
            ),
        );
        self.message(to, None, "Reset your password".into(), text, html)
    }

    /// Assignment notice for a task or subtask
    #[allow(clippy::too_many_arguments)]
    pub fn task_assigned(
        &self,
        to: &str,
        name: Option<&str>,
        title: &str,
        description: &str,
        due_date: DateTime<Utc>,
        assigned_by: &str,
        is_subtask: bool,
    ) -> EmailMessage {
        let kind = if is_subtask { "Subtask" } else { "Task" };
        let subject = format!("New {} Assigned: {}", kind, title);
        let text = format!(
            "Hello {},\n\nYou have been assigned a new {}: \"{}\" due {} by {}.\n\n{}",
            name.unwrap_or("there"),
            kind.to_lowercase(),
            title,
            format_event_time(due_date),
            assigned_by,
            self.app_url
        );
        let html = layout(
            "#2196F3",
            &format!("Hello {},", greeting(name)),
            &format!(
                "<p>You have been assigned a new {}:</p>{}",
                kind.to_lowercase(),
                rows(&[
                    (kind, title.to_string()),
                    ("Description", description.to_string()),
                    ("Due Date", format_due_date(due_date)),
                    ("Assigned by", assigned_by.to_string()),
                ])
            ),
        );
        self.message(to, name, subject, text, html)
    }

    /// Sent to delegates after the owner edits a task; `title` is the title before the edit
    pub fn task_updated(
        &self,
        to: &str,
        name: Option<&str>,
        title: &str,
        description: &str,
        due_date: DateTime<Utc>,
    ) -> EmailMessage {
        let subject = format!("Updated Task Details: {}", title);
        let text = format!(
            "Dear {},\n\nThe details for the task \"{}\" have been updated. Please log in to SmartVA to review the changes.\n\n{}",
            name.unwrap_or("there"),
            title,
            self.app_url
        );
        let html = layout(
            "#2196F3",
            &format!("Task Updated: {}", escape(title)),
            &format!(
                "<p>Dear {},</p><p>The details for the task \"<strong>{}</strong>\" have been updated.</p>{}<p>Please <strong>log in to SmartVA</strong> to view full details and manage the task.</p>",
                greeting(name),
                escape(title),
                rows(&[
                    ("Description", description.to_string()),
                    ("Due Date", format_due_date(due_date)),
                ])
            ),
        );
        self.message(to, name, subject, text, html)
    }

    /// Free-form message from a task owner to one of their delegates
    pub fn delegate_message(&self, to: &str, sender_name: &str, subject: &str, body: &str) -> EmailMessage {
        let html = layout(
            "#2196F3",
            &escape(subject),
            &format!("<p>{}</p><p>Sent by <strong>{}</strong> via SmartVA.</p>", escape(body), escape(sender_name)),
        );
        self.message(to, None, subject.to_string(), body.to_string(), html)
            .from_name(sender_name)
    }

    pub fn subtask_reminder(
        &self,
        to: &str,
        name: Option<&str>,
        subtask_title: &str,
        body: &str,
        sender_name: &str,
    ) -> EmailMessage {
        let text = format!(
            "Hello {},\n\nRegarding your subtask \"{}\":\n\n{}\n\n{}",
            name.unwrap_or("there"),
            subtask_title,
            body,
            sender_name
        );
        let html = layout(
            "#FF9800",
            &format!("Hello {},", greeting(name)),
            &format!(
                "<p>Regarding your subtask \"<strong>{}</strong>\":</p><p>{}</p><p>Sent by <strong>{}</strong>.</p>",
                escape(subtask_title),
                escape(body),
                escape(sender_name)
            ),
        );
        self.message(to, name, "Subtask Reminder".into(), text, html)
            .from_name(sender_name)
    }

    fn event_rows(event: &Event) -> String {
        rows(&[
            ("Event", event.title.clone()),
            ("Date & Time", time_range(event.start_time, event.end_time)),
            ("Venue", event.venue.clone()),
            ("Organized by", event.va_name.clone()),
        ])
    }

    fn event_text(intro: &str, name: Option<&str>, event: &Event) -> String {
        format!(
            "Hello {},\n\n{}\n\nEvent: {}\nDate & Time: {}\nVenue: {}\nOrganized by: {}",
            name.unwrap_or("there"),
            intro,
            event.title,
            time_range(event.start_time, event.end_time),
            event.venue,
            event.va_name
        )
    }

    pub fn event_invitation(&self, to: &str, name: Option<&str>, event: &Event) -> EmailMessage {
        let intro = "You have been added as a participant in the following event:";
        let html = layout(
            "#4CAF50",
            &format!("Hello {},", greeting(name)),
            &format!("<p>{}</p>{}", intro, Self::event_rows(event)),
        );
        self.message(
            to,
            name,
            format!("You’ve been added to an event: {}", event.title),
            Self::event_text(intro, name, event),
            html,
        )
    }

    pub fn event_updated(&self, to: &str, name: Option<&str>, event: &Event) -> EmailMessage {
        let intro = format!("The details for the event \"{}\" have been updated.", event.title);
        let html = layout(
            "#4CAF50",
            &format!("Event Updated: {}", escape(&event.title)),
            &format!(
                "<p>Dear {},</p><p>{}</p>{}<p>Please <strong>log in to SmartVA</strong> to view full details.</p>",
                greeting(name),
                escape(&intro),
                Self::event_rows(event)
            ),
        );
        self.message(
            to,
            name,
            format!("Updated Event Details: {}", event.title),
            Self::event_text(&intro, name, event),
            html,
        )
    }

    pub fn event_cancelled(&self, to: &str, name: Option<&str>, event: &Event) -> EmailMessage {
        let intro = "We regret to inform you that the following event has been cancelled:";
        let html = layout(
            "#f44336",
            &format!("Hello {},", greeting(name)),
            &format!(
                "<p>{}</p>{}<p>If you have any questions, please contact the VA handling this event.</p>",
                intro,
                Self::event_rows(event)
            ),
        );
        self.message(
            to,
            name,
            format!("Event Cancelled: {}", event.title),
            Self::event_text(intro, name, event),
            html,
        )
    }

    pub fn event_reminder(&self, to: &str, name: Option<&str>, event: &Event) -> EmailMessage {
        let intro = "This is a friendly reminder that you are scheduled to participate in the following event:";
        let html = layout(
            "#4CAF50",
            "Upcoming Event Reminder",
            &format!(
                "<p>Dear {},</p><p>{}</p>{}<p>Please <a href=\"{}\">log in to SmartVA</a> to view full details.</p>",
                greeting(name),
                intro,
                Self::event_rows(event),
                escape(&self.app_url)
            ),
        );
        self.message(
            to,
            name,
            format!("Reminder for {}", event.title),
            Self::event_text(intro, name, event),
            html,
        )
        .from_name(event.va_name.clone())
    }
}
