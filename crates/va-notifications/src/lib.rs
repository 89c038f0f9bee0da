//! # va-notifications
//!
//! Side-effect delivery for SmartVA RS.
//!
//! ## Features
//!
//! - Email messages with console, in-memory and Resend HTTP senders
//! - Email templates for accounts, tasks and events
//! - Background job queue with scheduled runs, retries and recurring jobs
//! - Per-user realtime push hub

pub mod email;
pub mod jobs;
pub mod realtime;
pub mod resend;
pub mod templates;

pub use email::{
    ConsoleEmailSender, EmailAddress, EmailError, EmailMessage, EmailResult, EmailSender,
    MemoryEmailSender,
};
pub use jobs::{
    EmailReminderArgs, ExpiredEventArgs, Job, JobError, JobHandler, JobPriority, JobQueue,
    JobResult, JobStatus, JobWorker, MemoryJobQueue, NotificationArgs,
};
pub use realtime::{NotificationHub, PushMessage};
pub use resend::ResendEmailSender;
pub use templates::EmailTemplates;
