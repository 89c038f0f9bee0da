//! # va-models
//!
//! Domain models for SmartVA RS.
//!
//! Every owned entity carries the id of the user that created it and
//! implements the core traits from `va-core` (Identifiable, Owned).
//! JSON field names are camelCase with the primary key exposed as `_id`.

pub use va_core::{Id, Identifiable, Owned};

pub mod contact;
pub mod document;
pub mod event;
pub mod naming;
pub mod note;
pub mod notification;
pub mod task;
pub mod user;
pub mod visitor;

pub use contact::Contact;
pub use document::{Document, DocumentResponse, DocumentType, ReceptionMode, ResponseStatus};
pub use event::{BusyTime, ConcernedMember, Event};
pub use note::Note;
pub use notification::Notification;
pub use task::{Delegate, Priority, Subtask, Task, TaskStatus};
pub use user::{User, UserSummary};
pub use visitor::Visitor;

/// Error returned when parsing one of the closed string enums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}
