//! User store
//!
//! Emails are stored lowercased so lookups are case-insensitive.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use va_core::Id;
use va_models::User;

use crate::memory::MemoryTable;
use crate::repository::{RepositoryError, RepositoryResult};

const USER_COLUMNS: &str = "id, user_name, email, password_hash, full_name, verify_token, \
     verify_token_expiry, reset_token, reset_token_expiry, verified, created_at";

/// User database entity
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Id,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub verify_token: Option<String>,
    pub verify_token_expiry: Option<DateTime<Utc>>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            user_name: row.user_name,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            verify_token: row.verify_token,
            verify_token_expiry: row.verify_token_expiry,
            reset_token: row.reset_token,
            reset_token_expiry: row.reset_token_expiry,
            verified: row.verified,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; `Conflict` when the email or user name is taken
    async fn create(&self, user: User) -> RepositoryResult<User>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn find_by_user_name(&self, user_name: &str) -> RepositoryResult<Option<User>>;

    /// Look up by hashed verification code
    async fn find_by_verify_token(&self, hashed: &str) -> RepositoryResult<Option<User>>;

    /// Look up by hashed reset code
    async fn find_by_reset_token(&self, hashed: &str) -> RepositoryResult<Option<User>>;

    /// Users registered under any of the given emails
    async fn find_by_emails(&self, emails: &[String]) -> RepositoryResult<Vec<User>>;

    async fn find_by_ids(&self, ids: &[Id]) -> RepositoryResult<Vec<User>>;

    /// Persist every field of an existing user
    async fn update(&self, user: &User) -> RepositoryResult<User>;
}

/// Postgres user store
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            USER_COLUMNS, USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.user_name)
            .bind(user.email.to_lowercase())
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .bind(&user.verify_token)
            .bind(user.verify_token_expiry)
            .bind(&user.reset_token)
            .bind(user.reset_token_expiry)
            .bind(user.verified)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.find_one("email", &email.trim().to_lowercase()).await
    }

    async fn find_by_user_name(&self, user_name: &str) -> RepositoryResult<Option<User>> {
        self.find_one("user_name", user_name.trim()).await
    }

    async fn find_by_verify_token(&self, hashed: &str) -> RepositoryResult<Option<User>> {
        self.find_one("verify_token", hashed).await
    }

    async fn find_by_reset_token(&self, hashed: &str) -> RepositoryResult<Option<User>> {
        self.find_one("reset_token", hashed).await
    }

    async fn find_by_emails(&self, emails: &[String]) -> RepositoryResult<Vec<User>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let lowered: Vec<String> = emails.iter().map(|e| e.trim().to_lowercase()).collect();
        let sql = format!("SELECT {} FROM users WHERE email = ANY($1)", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&lowered)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_ids(&self, ids: &[Id]) -> RepositoryResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update(&self, user: &User) -> RepositoryResult<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET user_name = $2, email = $3, password_hash = $4, full_name = $5,
                verify_token = $6, verify_token_expiry = $7,
                reset_token = $8, reset_token_expiry = $9, verified = $10
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.user_name)
            .bind(user.email.to_lowercase())
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .bind(&user.verify_token)
            .bind(user.verify_token_expiry)
            .bind(&user.reset_token)
            .bind(user.reset_token_expiry)
            .bind(user.verified)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::from)
            .ok_or_else(|| RepositoryError::NotFound("User".into()))
    }
}

/// In-memory user store
#[derive(Default)]
pub struct MemoryUserStore {
    table: MemoryTable<User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn clashes(a: &User, b: &User) -> bool {
    a.email.eq_ignore_ascii_case(&b.email) || a.user_name == b.user_name
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, mut user: User) -> RepositoryResult<User> {
        user.email = user.email.to_lowercase();
        let candidate = user.clone();
        self.table
            .insert_unique(user, "users_email_key", |existing| clashes(existing, &candidate))
            .await
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        Ok(self.table.get(id).await)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.table.find(|u| u.email == email).await)
    }

    async fn find_by_user_name(&self, user_name: &str) -> RepositoryResult<Option<User>> {
        let user_name = user_name.trim();
        Ok(self.table.find(|u| u.user_name == user_name).await)
    }

    async fn find_by_verify_token(&self, hashed: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .table
            .find(|u| u.verify_token.as_deref() == Some(hashed))
            .await)
    }

    async fn find_by_reset_token(&self, hashed: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .table
            .find(|u| u.reset_token.as_deref() == Some(hashed))
            .await)
    }

    async fn find_by_emails(&self, emails: &[String]) -> RepositoryResult<Vec<User>> {
        let lowered: Vec<String> = emails.iter().map(|e| e.trim().to_lowercase()).collect();
        Ok(self.table.filter(|u| lowered.contains(&u.email)).await)
    }

    async fn find_by_ids(&self, ids: &[Id]) -> RepositoryResult<Vec<User>> {
        Ok(self.table.filter(|u| ids.contains(&u.id)).await)
    }

    async fn update(&self, user: &User) -> RepositoryResult<User> {
        let mut user = user.clone();
        user.email = user.email.to_lowercase();
        let candidate = user.clone();
        let found = self
            .table
            .replace_unique(user, "users_email_key", |existing| clashes(existing, &candidate))
            .await?;
        if !found {
            return Err(RepositoryError::NotFound("User".into()));
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(name: &str, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            user_name: name.into(),
            email: email.into(),
            password_hash: "hash".into(),
            full_name: name.into(),
            verify_token: None,
            verify_token_expiry: None,
            reset_token: None,
            reset_token_expiry: None,
            verified: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_case_insensitive() {
        let store = MemoryUserStore::new();
        let created = store.create(user("ada", "Ada@Example.com")).await.unwrap();
        assert_eq!(created.email, "ada@example.com");

        let found = store.find_by_email("ADA@example.COM").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryUserStore::new();
        store.create(user("ada", "ada@example.com")).await.unwrap();
        let err = store.create(user("other", "ada@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err = store.create(user("ada", "second@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_and_token_lookup() {
        let store = MemoryUserStore::new();
        let mut u = store.create(user("ada", "ada@example.com")).await.unwrap();
        u.verify_token = Some("abc".into());
        store.update(&u).await.unwrap();

        let found = store.find_by_verify_token("abc").await.unwrap();
        assert!(found.is_some());

        let missing = user("ghost", "ghost@example.com");
        assert!(matches!(
            store.update(&missing).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_emails() {
        let store = MemoryUserStore::new();
        store.create(user("a", "a@example.com")).await.unwrap();
        store.create(user("b", "b@example.com")).await.unwrap();

        let found = store
            .find_by_emails(&["A@example.com".to_string(), "c@example.com".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
