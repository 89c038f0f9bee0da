//! Store bundle handed to the service layer

use std::sync::Arc;

use sqlx::PgPool;

use crate::contacts::{ContactStore, MemoryContactStore, PgContactStore};
use crate::documents::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use crate::events::{
    BusyTimeStore, EventStore, MemoryBusyTimeStore, MemoryEventStore, PgBusyTimeStore,
    PgEventStore,
};
use crate::notes::{MemoryNoteStore, NoteStore, PgNoteStore};
use crate::notifications::{MemoryNotificationStore, NotificationStore, PgNotificationStore};
use crate::tasks::{MemoryTaskStore, PgTaskStore, TaskStore};
use crate::users::{MemoryUserStore, PgUserStore, UserStore};
use crate::visitors::{MemoryVisitorStore, PgVisitorStore, VisitorStore};

/// One handle per collection
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub events: Arc<dyn EventStore>,
    pub busy_times: Arc<dyn BusyTimeStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub visitors: Arc<dyn VisitorStore>,
    pub notes: Arc<dyn NoteStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            tasks: Arc::new(PgTaskStore::new(pool.clone())),
            events: Arc::new(PgEventStore::new(pool.clone())),
            busy_times: Arc::new(PgBusyTimeStore::new(pool.clone())),
            documents: Arc::new(PgDocumentStore::new(pool.clone())),
            contacts: Arc::new(PgContactStore::new(pool.clone())),
            visitors: Arc::new(PgVisitorStore::new(pool.clone())),
            notes: Arc::new(PgNoteStore::new(pool.clone())),
            notifications: Arc::new(PgNotificationStore::new(pool)),
        }
    }

    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            tasks: Arc::new(MemoryTaskStore::new()),
            events: Arc::new(MemoryEventStore::new()),
            busy_times: Arc::new(MemoryBusyTimeStore::new()),
            documents: Arc::new(MemoryDocumentStore::new()),
            contacts: Arc::new(MemoryContactStore::new()),
            visitors: Arc::new(MemoryVisitorStore::new()),
            notes: Arc::new(MemoryNoteStore::new()),
            notifications: Arc::new(MemoryNotificationStore::new()),
        }
    }
}
