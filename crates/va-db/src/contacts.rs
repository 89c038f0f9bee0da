//! Contact store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use va_core::{Id, Owned};
use va_models::Contact;

use crate::memory::MemoryTable;
use crate::repository::{contains_ci, like_pattern, RepositoryError, RepositoryResult};

const CONTACT_COLUMNS: &str =
    "id, name, company_name, email, position, phone_number, user_id, created_at, updated_at";

/// Contact database entity
#[derive(Debug, Clone, FromRow)]
pub struct ContactRow {
    pub id: Id,
    pub name: String,
    pub company_name: String,
    pub email: String,
    pub position: String,
    pub phone_number: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: row.id,
            name: row.name,
            company_name: row.company_name,
            email: row.email,
            position: row.position,
            phone_number: row.phone_number,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// `Conflict` when the owner already has this email or phone number
    async fn insert(&self, contact: Contact) -> RepositoryResult<Contact>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Contact>>;

    async fn update(&self, contact: &Contact) -> RepositoryResult<Contact>;

    async fn delete(&self, id: Id) -> RepositoryResult<bool>;

    /// Newest first
    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Contact>>;

    async fn email_taken(&self, owner: Id, email: &str, exclude: Option<Id>) -> RepositoryResult<bool>;

    async fn search_company(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Contact>>;

    async fn search_name(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Contact>>;
}

/// Postgres contact store
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn search_column(&self, owner: Id, column: &str, needle: &str) -> RepositoryResult<Vec<Contact>> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE user_id = $1 AND {} ILIKE $2 ORDER BY created_at DESC",
            CONTACT_COLUMNS, column
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(owner)
            .bind(like_pattern(needle))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Contact::from).collect())
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn insert(&self, contact: Contact) -> RepositoryResult<Contact> {
        let sql = format!(
            r#"
            INSERT INTO contacts ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            CONTACT_COLUMNS, CONTACT_COLUMNS
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(contact.id)
            .bind(&contact.name)
            .bind(&contact.company_name)
            .bind(&contact.email)
            .bind(&contact.position)
            .bind(&contact.phone_number)
            .bind(contact.user_id)
            .bind(contact.created_at)
            .bind(contact.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = $1", CONTACT_COLUMNS);
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Contact::from))
    }

    async fn update(&self, contact: &Contact) -> RepositoryResult<Contact> {
        let sql = format!(
            r#"
            UPDATE contacts
            SET name = $2, company_name = $3, email = $4, position = $5,
                phone_number = $6, updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            CONTACT_COLUMNS
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(contact.id)
            .bind(&contact.name)
            .bind(&contact.company_name)
            .bind(&contact.email)
            .bind(&contact.position)
            .bind(&contact.phone_number)
            .bind(contact.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Contact::from)
            .ok_or_else(|| RepositoryError::NotFound("Contact".into()))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Contact>> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE user_id = $1 ORDER BY created_at DESC",
            CONTACT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn email_taken(&self, owner: Id, email: &str, exclude: Option<Id>) -> RepositoryResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM contacts
                WHERE user_id = $1 AND email = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(owner)
        .bind(email.trim().to_lowercase())
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn search_company(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Contact>> {
        self.search_column(owner, "company_name", needle).await
    }

    async fn search_name(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Contact>> {
        self.search_column(owner, "name", needle).await
    }
}

/// In-memory contact store
#[derive(Default)]
pub struct MemoryContactStore {
    table: MemoryTable<Contact>,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn newest_first<F>(&self, pred: F) -> Vec<Contact>
    where
        F: Fn(&Contact) -> bool,
    {
        let mut contacts = self.table.filter(pred).await;
        contacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        contacts
    }
}

fn clashes(a: &Contact, b: &Contact) -> bool {
    a.user_id == b.user_id && (a.email == b.email || a.phone_number == b.phone_number)
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn insert(&self, contact: Contact) -> RepositoryResult<Contact> {
        let candidate = contact.clone();
        self.table
            .insert_unique(contact, "contacts_user_email_key", |c| clashes(c, &candidate))
            .await
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Contact>> {
        Ok(self.table.get(id).await)
    }

    async fn update(&self, contact: &Contact) -> RepositoryResult<Contact> {
        let found = self
            .table
            .replace_unique(contact.clone(), "contacts_user_email_key", |c| clashes(c, contact))
            .await?;
        if !found {
            return Err(RepositoryError::NotFound("Contact".into()));
        }
        Ok(contact.clone())
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.table.remove(id).await.is_some())
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Contact>> {
        Ok(self.newest_first(|c| c.is_owned_by(owner)).await)
    }

    async fn email_taken(&self, owner: Id, email: &str, exclude: Option<Id>) -> RepositoryResult<bool> {
        let email = email.trim().to_lowercase();
        Ok(self
            .table
            .any(|c| c.is_owned_by(owner) && c.email == email && Some(c.id) != exclude)
            .await)
    }

    async fn search_company(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Contact>> {
        Ok(self
            .newest_first(|c| c.is_owned_by(owner) && contains_ci(&c.company_name, needle))
            .await)
    }

    async fn search_name(&self, owner: Id, needle: &str) -> RepositoryResult<Vec<Contact>> {
        Ok(self
            .newest_first(|c| c.is_owned_by(owner) && contains_ci(&c.name, needle))
            .await)
    }
}
