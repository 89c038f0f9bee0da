//! Visitor log store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use va_core::{Id, Owned};
use va_models::Visitor;

use crate::memory::MemoryTable;
use crate::repository::{contains_ci, like_pattern, RepositoryError, RepositoryResult};

const VISITOR_COLUMNS: &str = "id, name, email, phone, message, user_id, created_at";

/// Visitor database entity
#[derive(Debug, Clone, FromRow)]
pub struct VisitorRow {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: Option<String>,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
}

impl From<VisitorRow> for Visitor {
    fn from(row: VisitorRow) -> Self {
        Visitor {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            message: row.message,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
pub trait VisitorStore: Send + Sync {
    async fn insert(&self, visitor: Visitor) -> RepositoryResult<Visitor>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Visitor>>;

    async fn update(&self, visitor: &Visitor) -> RepositoryResult<Visitor>;

    async fn delete(&self, id: Id) -> RepositoryResult<bool>;

    /// Newest first
    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Visitor>>;

    async fn search_name(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Visitor>>;

    /// Visitors created within `[start, end)`
    async fn list_created_between(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Visitor>>;

    /// Delete every visitor created at or before `cutoff`
    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64>;
}

/// Postgres visitor store
pub struct PgVisitorStore {
    pool: PgPool,
}

impl PgVisitorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitorStore for PgVisitorStore {
    async fn insert(&self, visitor: Visitor) -> RepositoryResult<Visitor> {
        let sql = format!(
            "INSERT INTO visitors ({}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            VISITOR_COLUMNS, VISITOR_COLUMNS
        );
        let row = sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(visitor.id)
            .bind(&visitor.name)
            .bind(&visitor.email)
            .bind(&visitor.phone)
            .bind(&visitor.message)
            .bind(visitor.user_id)
            .bind(visitor.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Visitor>> {
        let sql = format!("SELECT {} FROM visitors WHERE id = $1", VISITOR_COLUMNS);
        let row = sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Visitor::from))
    }

    async fn update(&self, visitor: &Visitor) -> RepositoryResult<Visitor> {
        let sql = format!(
            r#"
            UPDATE visitors
            SET name = $2, email = $3, phone = $4, message = $5
            WHERE id = $1
            RETURNING {}
            "#,
            VISITOR_COLUMNS
        );
        let row = sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(visitor.id)
            .bind(&visitor.name)
            .bind(&visitor.email)
            .bind(&visitor.phone)
            .bind(&visitor.message)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Visitor::from)
            .ok_or_else(|| RepositoryError::NotFound("Visitor".into()))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM visitors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Visitor>> {
        let sql = format!(
            "SELECT {} FROM visitors WHERE user_id = $1 ORDER BY created_at DESC",
            VISITOR_COLUMNS
        );
        let rows = sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Visitor::from).collect())
    }

    async fn search_name(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Visitor>> {
        let sql = format!(
            "SELECT {} FROM visitors WHERE user_id = $1 AND name ILIKE $2 ORDER BY created_at DESC",
            VISITOR_COLUMNS
        );
        let rows = sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(owner)
            .bind(like_pattern(needle))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Visitor::from).collect())
    }

    async fn list_created_between(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Visitor>> {
        let sql = format!(
            r#"
            SELECT {} FROM visitors
            WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY created_at DESC
            "#,
            VISITOR_COLUMNS
        );
        let rows = sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(owner)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Visitor::from).collect())
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM visitors WHERE created_at <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// In-memory visitor store
#[derive(Default)]
pub struct MemoryVisitorStore {
    table: MemoryTable<Visitor>,
}

impl MemoryVisitorStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn newest_first<F>(&self, pred: F) -> Vec<Visitor>
    where
        F: Fn(&Visitor) -> bool,
    {
        let mut visitors = self.table.filter(pred).await;
        visitors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        visitors
    }
}

#[async_trait]
impl VisitorStore for MemoryVisitorStore {
    async fn insert(&self, visitor: Visitor) -> RepositoryResult<Visitor> {
        Ok(self.table.insert(visitor).await)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Visitor>> {
        Ok(self.table.get(id).await)
    }

    async fn update(&self, visitor: &Visitor) -> RepositoryResult<Visitor> {
        if self.table.replace(visitor.clone()).await {
            Ok(visitor.clone())
        } else {
            Err(RepositoryError::NotFound("Visitor".into()))
        }
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.table.remove(id).await.is_some())
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Visitor>> {
        Ok(self.newest_first(|v| v.is_owned_by(owner)).await)
    }

    async fn search_name(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Visitor>> {
        Ok(self
            .newest_first(|v| v.is_owned_by(owner) && contains_ci(&v.name, needle))
            .await)
    }

    async fn list_created_between(
        &self,
        owner: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Visitor>> {
        Ok(self
            .newest_first(|v| v.is_owned_by(owner) && v.created_at >= start && v.created_at < end)
            .await)
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64> {
        Ok(self.table.remove_where(|v| v.created_at <= cutoff).await)
    }
}
