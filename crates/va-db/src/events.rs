//! Event and busy-time stores

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use va_core::{Id, Owned};
use va_models::{BusyTime, ConcernedMember, Event};

use crate::memory::MemoryTable;
use crate::repository::{RepositoryError, RepositoryResult};

const EVENT_COLUMNS: &str = "id, title, va_name, start_time, end_time, venue, concerned_members, \
     reminder, reminder_time, user_id, created_at, updated_at";

const BUSY_COLUMNS: &str = "id, start_time, end_time, title, user_id, event_id";

/// Event database entity
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Id,
    pub title: String,
    pub va_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub venue: String,
    pub concerned_members: Json<Vec<ConcernedMember>>,
    pub reminder: bool,
    pub reminder_time: Option<DateTime<Utc>>,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            title: row.title,
            va_name: row.va_name,
            start_time: row.start_time,
            end_time: row.end_time,
            venue: row.venue,
            concerned_members: row.concerned_members.0,
            reminder: row.reminder,
            reminder_time: row.reminder_time,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Busy time database entity
#[derive(Debug, Clone, FromRow)]
pub struct BusyTimeRow {
    pub id: Id,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
    pub user_id: Id,
    pub event_id: Option<Id>,
}

impl From<BusyTimeRow> for BusyTime {
    fn from(row: BusyTimeRow) -> Self {
        BusyTime {
            id: row.id,
            start_time: row.start_time,
            end_time: row.end_time,
            title: row.title,
            user_id: row.user_id,
            event_id: row.event_id,
        }
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: Event) -> RepositoryResult<Event>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Event>>;

    async fn update(&self, event: &Event) -> RepositoryResult<Event>;

    async fn delete(&self, id: Id) -> RepositoryResult<bool>;

    /// Owner's events by start time
    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Event>>;

    /// Owner's events overlapping `[start, end)`
    async fn list_overlapping(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Event>>;

    /// Exact, case-insensitive title match
    async fn find_by_title(&self, owner: Id, title: &str) -> RepositoryResult<Option<Event>>;

    /// Events from any owner listing `email` as a concerned member
    async fn list_by_member(&self, email: &str) -> RepositoryResult<Vec<Event>>;
}

#[async_trait]
pub trait BusyTimeStore: Send + Sync {
    /// `Conflict` when the owner already has a busy time starting at the same instant
    async fn insert(&self, busy: BusyTime) -> RepositoryResult<BusyTime>;

    /// First busy time overlapping `[start, end)`, ignoring the given event's own block
    async fn find_conflict(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_event: Option<Id>,
    ) -> RepositoryResult<Option<BusyTime>>;

    /// Copy the event's interval and title onto its busy time
    async fn sync_with_event(&self, event: &Event) -> RepositoryResult<()>;

    async fn delete_for_event(&self, event_id: Id) -> RepositoryResult<()>;

    /// Busy times starting at or after `now`
    async fn list_upcoming(&self, owner: Id, now: DateTime<Utc>) -> RepositoryResult<Vec<BusyTime>>;
}

/// Postgres event store
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert(&self, event: Event) -> RepositoryResult<Event> {
        let sql = format!(
            r#"
            INSERT INTO events ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            EVENT_COLUMNS, EVENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event.id)
            .bind(&event.title)
            .bind(&event.va_name)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(&event.venue)
            .bind(Json(&event.concerned_members))
            .bind(event.reminder)
            .bind(event.reminder_time)
            .bind(event.user_id)
            .bind(event.created_at)
            .bind(event.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Event>> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Event::from))
    }

    async fn update(&self, event: &Event) -> RepositoryResult<Event> {
        let sql = format!(
            r#"
            UPDATE events
            SET title = $2, va_name = $3, start_time = $4, end_time = $5, venue = $6,
                concerned_members = $7, reminder = $8, reminder_time = $9, updated_at = $10
            WHERE id = $1
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event.id)
            .bind(&event.title)
            .bind(&event.va_name)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(&event.venue)
            .bind(Json(&event.concerned_members))
            .bind(event.reminder)
            .bind(event.reminder_time)
            .bind(event.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::from)
            .ok_or_else(|| RepositoryError::NotFound("Event".into()))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events WHERE user_id = $1 ORDER BY start_time ASC",
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn list_overlapping(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Event>> {
        let sql = format!(
            r#"
            SELECT {} FROM events
            WHERE user_id = $1 AND start_time < $3 AND end_time > $2
            ORDER BY start_time ASC
            "#,
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(owner)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn find_by_title(&self, owner: Id, title: &str) -> RepositoryResult<Option<Event>> {
        let sql = format!(
            "SELECT {} FROM events WHERE user_id = $1 AND LOWER(title) = LOWER($2) ORDER BY start_time ASC LIMIT 1",
            EVENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(owner)
            .bind(title.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Event::from))
    }

    async fn list_by_member(&self, email: &str) -> RepositoryResult<Vec<Event>> {
        let sql = format!(
            r#"
            SELECT {} FROM events
            WHERE concerned_members @> jsonb_build_array(jsonb_build_object('email', $1::text))
            ORDER BY start_time ASC
            "#,
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }
}

/// Postgres busy-time store
pub struct PgBusyTimeStore {
    pool: PgPool,
}

impl PgBusyTimeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BusyTimeStore for PgBusyTimeStore {
    async fn insert(&self, busy: BusyTime) -> RepositoryResult<BusyTime> {
        let sql = format!(
            "INSERT INTO busy_times ({}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            BUSY_COLUMNS, BUSY_COLUMNS
        );
        let row = sqlx::query_as::<_, BusyTimeRow>(&sql)
            .bind(busy.id)
            .bind(busy.start_time)
            .bind(busy.end_time)
            .bind(&busy.title)
            .bind(busy.user_id)
            .bind(busy.event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_conflict(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_event: Option<Id>,
    ) -> RepositoryResult<Option<BusyTime>> {
        let sql = format!(
            r#"
            SELECT {} FROM busy_times
            WHERE user_id = $1 AND start_time < $3 AND end_time > $2
              AND ($4::uuid IS NULL OR event_id IS DISTINCT FROM $4)
            ORDER BY start_time ASC
            LIMIT 1
            "#,
            BUSY_COLUMNS
        );
        let row = sqlx::query_as::<_, BusyTimeRow>(&sql)
            .bind(owner)
            .bind(start)
            .bind(end)
            .bind(exclude_event)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(BusyTime::from))
    }

    async fn sync_with_event(&self, event: &Event) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            UPDATE busy_times
            SET start_time = $2, end_time = $3, title = $4
            WHERE event_id = $1
            "#,
        )
        .bind(event.id)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.title)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_for_event(&self, event_id: Id) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM busy_times WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_upcoming(&self, owner: Id, now: DateTime<Utc>) -> RepositoryResult<Vec<BusyTime>> {
        let sql = format!(
            "SELECT {} FROM busy_times WHERE user_id = $1 AND start_time >= $2 ORDER BY start_time ASC",
            BUSY_COLUMNS
        );
        let rows = sqlx::query_as::<_, BusyTimeRow>(&sql)
            .bind(owner)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(BusyTime::from).collect())
    }
}

/// In-memory event store
#[derive(Default)]
pub struct MemoryEventStore {
    table: MemoryTable<Event>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sorted<F>(&self, pred: F) -> Vec<Event>
    where
        F: Fn(&Event) -> bool,
    {
        let mut events = self.table.filter(pred).await;
        events.sort_by_key(|e| e.start_time);
        events
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: Event) -> RepositoryResult<Event> {
        Ok(self.table.insert(event).await)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Event>> {
        Ok(self.table.get(id).await)
    }

    async fn update(&self, event: &Event) -> RepositoryResult<Event> {
        if self.table.replace(event.clone()).await {
            Ok(event.clone())
        } else {
            Err(RepositoryError::NotFound("Event".into()))
        }
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.table.remove(id).await.is_some())
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Event>> {
        Ok(self.sorted(|e| e.is_owned_by(owner)).await)
    }

    async fn list_overlapping(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Event>> {
        Ok(self
            .sorted(|e| e.is_owned_by(owner) && e.overlaps(start, end))
            .await)
    }

    async fn find_by_title(&self, owner: Id, title: &str) -> RepositoryResult<Option<Event>> {
        let title = title.trim().to_lowercase();
        Ok(self
            .sorted(|e| e.is_owned_by(owner) && e.title.to_lowercase() == title)
            .await
            .into_iter()
            .next())
    }

    async fn list_by_member(&self, email: &str) -> RepositoryResult<Vec<Event>> {
        Ok(self.sorted(|e| e.has_member(email)).await)
    }
}

/// In-memory busy-time store
#[derive(Default)]
pub struct MemoryBusyTimeStore {
    table: MemoryTable<BusyTime>,
}

impl MemoryBusyTimeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BusyTimeStore for MemoryBusyTimeStore {
    async fn insert(&self, busy: BusyTime) -> RepositoryResult<BusyTime> {
        let (owner, start) = (busy.user_id, busy.start_time);
        self.table
            .insert_unique(busy, "busy_times_user_start_key", |b| {
                b.is_owned_by(owner) && b.start_time == start
            })
            .await
    }

    async fn find_conflict(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_event: Option<Id>,
    ) -> RepositoryResult<Option<BusyTime>> {
        let mut hits = self
            .table
            .filter(|b| {
                b.is_owned_by(owner)
                    && b.overlaps(start, end)
                    && (exclude_event.is_none() || b.event_id != exclude_event)
            })
            .await;
        hits.sort_by_key(|b| b.start_time);
        Ok(hits.into_iter().next())
    }

    async fn sync_with_event(&self, event: &Event) -> RepositoryResult<()> {
        for mut busy in self.table.filter(|b| b.event_id == Some(event.id)).await {
            busy.start_time = event.start_time;
            busy.end_time = event.end_time;
            busy.title = event.title.clone();
            let (owner, start) = (busy.user_id, busy.start_time);
            self.table
                .replace_unique(busy, "busy_times_user_start_key", |b| {
                    b.is_owned_by(owner) && b.start_time == start
                })
                .await?;
        }
        Ok(())
    }

    async fn delete_for_event(&self, event_id: Id) -> RepositoryResult<()> {
        self.table.remove_where(|b| b.event_id == Some(event_id)).await;
        Ok(())
    }

    async fn list_upcoming(&self, owner: Id, now: DateTime<Utc>) -> RepositoryResult<Vec<BusyTime>> {
        let mut busy = self
            .table
            .filter(|b| b.is_owned_by(owner) && b.start_time >= now)
            .await;
        busy.sort_by_key(|b| b.start_time);
        Ok(busy)
    }
}
