//! # va-db
//!
//! Storage layer for SmartVA RS.
//!
//! This crate provides PostgreSQL access using SQLx, including:
//!
//! - Connection pool management and embedded migrations
//! - One store trait per collection, each with a Postgres and an in-memory
//!   implementation
//! - A Postgres-backed job queue for the background worker
//!
//! ## Example
//!
//! ```ignore
//! use va_db::{Database, Stores};
//!
//! let db = Database::connect(&config.database).await?;
//! db.migrate().await?;
//!
//! let stores = Stores::postgres(db.pool().clone());
//! let task = stores.tasks.find_by_id(id).await?;
//! ```

pub mod contacts;
pub mod documents;
pub mod events;
pub mod jobs;
pub mod memory;
pub mod notes;
pub mod notifications;
pub mod pool;
pub mod repository;
pub mod stores;
pub mod tasks;
pub mod users;
pub mod visitors;

// Re-exports
pub use contacts::{ContactStore, MemoryContactStore, PgContactStore};
pub use documents::{
    DocumentFilter, DocumentSort, DocumentStore, MemoryDocumentStore, PgDocumentStore, SortField,
};
pub use events::{
    BusyTimeStore, EventStore, MemoryBusyTimeStore, MemoryEventStore, PgBusyTimeStore,
    PgEventStore,
};
pub use jobs::PgJobQueue;
pub use notes::{MemoryNoteStore, NoteStore, PgNoteStore};
pub use notifications::{MemoryNotificationStore, NotificationStore, PgNotificationStore};
pub use pool::{Database, PoolStats};
pub use repository::{RepositoryError, RepositoryResult};
pub use stores::Stores;
pub use tasks::{MemoryTaskStore, PgTaskStore, TaskStore};
pub use users::{MemoryUserStore, PgUserStore, UserStore};
pub use visitors::{MemoryVisitorStore, PgVisitorStore, VisitorStore};
