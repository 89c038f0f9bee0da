//! Note store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use va_core::{Id, Owned};
use va_models::Note;

use crate::memory::MemoryTable;
use crate::repository::{contains_ci, like_pattern, RepositoryError, RepositoryResult};

const NOTE_COLUMNS: &str = "id, title, content_html, content_text, user_id, created_at, updated_at";

/// Note database entity
#[derive(Debug, Clone, FromRow)]
pub struct NoteRow {
    pub id: Id,
    pub title: String,
    pub content_html: String,
    pub content_text: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            id: row.id,
            title: row.title,
            content_html: row.content_html,
            content_text: row.content_text,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert(&self, note: Note) -> RepositoryResult<Note>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Note>>;

    async fn update(&self, note: &Note) -> RepositoryResult<Note>;

    async fn delete(&self, id: Id) -> RepositoryResult<bool>;

    /// Newest first
    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Note>>;

    async fn search_title(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Note>>;
}

/// Postgres note store
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn insert(&self, note: Note) -> RepositoryResult<Note> {
        let sql = format!(
            "INSERT INTO notes ({}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            NOTE_COLUMNS, NOTE_COLUMNS
        );
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(note.id)
            .bind(&note.title)
            .bind(&note.content_html)
            .bind(&note.content_text)
            .bind(note.user_id)
            .bind(note.created_at)
            .bind(note.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Note>> {
        let sql = format!("SELECT {} FROM notes WHERE id = $1", NOTE_COLUMNS);
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Note::from))
    }

    async fn update(&self, note: &Note) -> RepositoryResult<Note> {
        let sql = format!(
            r#"
            UPDATE notes
            SET title = $2, content_html = $3, content_text = $4, updated_at = $5
            WHERE id = $1
            RETURNING {}
            "#,
            NOTE_COLUMNS
        );
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(note.id)
            .bind(&note.title)
            .bind(&note.content_html)
            .bind(&note.content_text)
            .bind(note.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Note::from)
            .ok_or_else(|| RepositoryError::NotFound("Note".into()))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE user_id = $1 ORDER BY created_at DESC",
            NOTE_COLUMNS
        );
        let rows = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn search_title(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE user_id = $1 AND title ILIKE $2 ORDER BY created_at DESC",
            NOTE_COLUMNS
        );
        let rows = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(owner)
            .bind(like_pattern(needle))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Note::from).collect())
    }
}

/// In-memory note store
#[derive(Default)]
pub struct MemoryNoteStore {
    table: MemoryTable<Note>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn newest_first<F>(&self, pred: F) -> Vec<Note>
    where
        F: Fn(&Note) -> bool,
    {
        let mut notes = self.table.filter(pred).await;
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn insert(&self, note: Note) -> RepositoryResult<Note> {
        Ok(self.table.insert(note).await)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Note>> {
        Ok(self.table.get(id).await)
    }

    async fn update(&self, note: &Note) -> RepositoryResult<Note> {
        if self.table.replace(note.clone()).await {
            Ok(note.clone())
        } else {
            Err(RepositoryError::NotFound("Note".into()))
        }
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.table.remove(id).await.is_some())
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Note>> {
        Ok(self.newest_first(|n| n.is_owned_by(owner)).await)
    }

    async fn search_title(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Note>> {
        Ok(self
            .newest_first(|n| n.is_owned_by(owner) && contains_ci(&n.title, needle))
            .await)
    }
}
