//! # va-services
//!
//! Business operations for SmartVA RS.
//!
//! Each module exposes one service struct built from a [`ServiceContext`].
//! A service validates its input with the matching contract, talks to the
//! stores and then dispatches side effects (email, notification + push,
//! scheduled jobs). Side effects are best effort: a failure is logged and
//! the operation still succeeds, except where noted.

pub mod contacts;
pub mod context;
pub mod documents;
pub mod events;
pub mod handlers;
pub mod notes;
pub mod profile;
pub mod tasks;
pub mod testing;
pub mod users;
pub mod visitors;

pub use contacts::ContactService;
pub use context::ServiceContext;
pub use documents::{DocumentList, DocumentService};
pub use events::{EventService, MemberEvents};
pub use handlers::register_job_handlers;
pub use notes::NoteService;
pub use profile::{ProfileService, SupervisorGroup};
pub use tasks::TaskService;
pub use users::{Session, UserService};
pub use visitors::VisitorService;
