//! Notification store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use va_core::{Id, Owned};
use va_models::Notification;

use crate::memory::MemoryTable;
use crate::repository::RepositoryResult;

/// Notification database entity
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Id,
    pub message: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            message: row.message,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> RepositoryResult<Notification>;

    /// Newest first
    async fn list_for_user(&self, user_id: Id) -> RepositoryResult<Vec<Notification>>;

    /// Delete only when owned by `user_id`
    async fn delete_owned(&self, id: Id, user_id: Id) -> RepositoryResult<bool>;
}

/// Postgres notification store
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, notification: Notification) -> RepositoryResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, message, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, message, user_id, created_at
            "#,
        )
        .bind(notification.id)
        .bind(&notification.message)
        .bind(notification.user_id)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_for_user(&self, user_id: Id) -> RepositoryResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, message, user_id, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn delete_owned(&self, id: Id, user_id: Id) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory notification store
#[derive(Default)]
pub struct MemoryNotificationStore {
    table: MemoryTable<Notification>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> RepositoryResult<Notification> {
        Ok(self.table.insert(notification).await)
    }

    async fn list_for_user(&self, user_id: Id) -> RepositoryResult<Vec<Notification>> {
        let mut notifications = self.table.filter(|n| n.is_owned_by(user_id)).await;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn delete_owned(&self, id: Id, user_id: Id) -> RepositoryResult<bool> {
        Ok(self
            .table
            .remove_if(id, |n| n.is_owned_by(user_id))
            .await
            .is_some())
    }
}
