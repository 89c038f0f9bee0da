//! Task store
//!
//! Delegates and subtasks are embedded JSONB arrays; membership queries use
//! containment (`@>`) against `{"userId": ..}` or `{"email": ..}`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use va_core::{Id, Owned, Page, PageParams};
use va_models::{Delegate, Subtask, Task};

use crate::memory::MemoryTable;
use crate::repository::{parse_column, RepositoryError, RepositoryResult};

const TASK_COLUMNS: &str =
    "id, title, description, due_date, delegate, priority, status, user_id, sub_tasks, created_at, updated_at";

/// Registered delegate on the task itself
const MAIN_DELEGATE_USER: &str = "delegate @> jsonb_build_array(jsonb_build_object('userId', $1::text))";

/// Registered delegate on any subtask
const SUBTASK_DELEGATE_USER: &str = "EXISTS (SELECT 1 FROM jsonb_array_elements(sub_tasks) s \
     WHERE s->'delegate' @> jsonb_build_array(jsonb_build_object('userId', $1::text)))";

/// Task database entity
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub delegate: Json<Vec<Delegate>>,
    pub priority: String,
    pub status: String,
    pub user_id: Id,
    pub sub_tasks: Json<Vec<Subtask>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            delegate: row.delegate.0,
            priority: parse_column(&row.priority)?,
            status: parse_column(&row.status)?,
            user_id: row.user_id,
            sub_tasks: row.sub_tasks.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> RepositoryResult<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: Task) -> RepositoryResult<Task>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Task>>;

    /// Parent task of the given subtask
    async fn find_by_subtask_id(&self, subtask_id: Id) -> RepositoryResult<Option<Task>>;

    /// Persist every field of an existing task
    async fn update(&self, task: &Task) -> RepositoryResult<Task>;

    async fn delete(&self, id: Id) -> RepositoryResult<bool>;

    /// Tasks created by `owner`, earliest due first
    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Task>>;

    /// Owned tasks plus tasks naming `user_id` as a main delegate, earliest due first
    async fn page_visible(&self, user_id: Id, params: PageParams) -> RepositoryResult<Page<Task>>;

    /// Visible tasks plus tasks where the user (by id or email) delegates a subtask
    async fn list_involving(&self, user_id: Id, email: &str) -> RepositoryResult<Vec<Task>>;

    /// Tasks, from any owner, where `email` delegates the task or a subtask
    async fn list_by_delegate_email(&self, email: &str) -> RepositoryResult<Vec<Task>>;
}

/// Postgres task store
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn insert(&self, task: Task) -> RepositoryResult<Task> {
        let sql = format!(
            r#"
            INSERT INTO tasks ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            TASK_COLUMNS, TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.due_date)
            .bind(Json(&task.delegate))
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(task.user_id)
            .bind(Json(&task.sub_tasks))
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Task::try_from).transpose()
    }

    async fn find_by_subtask_id(&self, subtask_id: Id) -> RepositoryResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE sub_tasks @> jsonb_build_array(jsonb_build_object('_id', $1::text))",
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(subtask_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Task::try_from).transpose()
    }

    async fn update(&self, task: &Task) -> RepositoryResult<Task> {
        let sql = format!(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, due_date = $4, delegate = $5,
                priority = $6, status = $7, sub_tasks = $8, updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.due_date)
            .bind(Json(&task.delegate))
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(Json(&task.sub_tasks))
            .bind(task.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| RepositoryError::NotFound("Task".into()))?
            .try_into()
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY due_date ASC",
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        into_tasks(rows)
    }

    async fn page_visible(&self, user_id: Id, params: PageParams) -> RepositoryResult<Page<Task>> {
        let scope = format!("user_id = $2 OR {}", MAIN_DELEGATE_USER);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tasks WHERE {}", scope))
            .bind(user_id.to_string())
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM tasks WHERE {} ORDER BY due_date ASC LIMIT $3 OFFSET $4",
            TASK_COLUMNS, scope
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id.to_string())
            .bind(user_id)
            .bind(params.limit)
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(into_tasks(rows)?, total, params))
    }

    async fn list_involving(&self, user_id: Id, email: &str) -> RepositoryResult<Vec<Task>> {
        let sql = format!(
            r#"
            SELECT {} FROM tasks
            WHERE user_id = $2
               OR {}
               OR {}
               OR delegate @> jsonb_build_array(jsonb_build_object('email', $3::text))
               OR EXISTS (SELECT 1 FROM jsonb_array_elements(sub_tasks) s
                          WHERE s->'delegate' @> jsonb_build_array(jsonb_build_object('email', $3::text)))
            ORDER BY due_date ASC
            "#,
            TASK_COLUMNS, MAIN_DELEGATE_USER, SUBTASK_DELEGATE_USER
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id.to_string())
            .bind(user_id)
            .bind(email.trim().to_lowercase())
            .fetch_all(&self.pool)
            .await?;

        into_tasks(rows)
    }

    async fn list_by_delegate_email(&self, email: &str) -> RepositoryResult<Vec<Task>> {
        let sql = format!(
            r#"
            SELECT {} FROM tasks
            WHERE delegate @> jsonb_build_array(jsonb_build_object('email', $1::text))
               OR EXISTS (SELECT 1 FROM jsonb_array_elements(sub_tasks) s
                          WHERE s->'delegate' @> jsonb_build_array(jsonb_build_object('email', $1::text)))
            ORDER BY due_date ASC
            "#,
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_all(&self.pool)
            .await?;

        into_tasks(rows)
    }
}

/// In-memory task store
#[derive(Default)]
pub struct MemoryTaskStore {
    table: MemoryTable<Task>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sorted<F>(&self, pred: F) -> Vec<Task>
    where
        F: Fn(&Task) -> bool,
    {
        let mut tasks = self.table.filter(pred).await;
        tasks.sort_by_key(|t| t.due_date);
        tasks
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, task: Task) -> RepositoryResult<Task> {
        Ok(self.table.insert(task).await)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Task>> {
        Ok(self.table.get(id).await)
    }

    async fn find_by_subtask_id(&self, subtask_id: Id) -> RepositoryResult<Option<Task>> {
        Ok(self.table.find(|t| t.subtask(subtask_id).is_some()).await)
    }

    async fn update(&self, task: &Task) -> RepositoryResult<Task> {
        if self.table.replace(task.clone()).await {
            Ok(task.clone())
        } else {
            Err(RepositoryError::NotFound("Task".into()))
        }
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.table.remove(id).await.is_some())
    }

    async fn list_owned(&self, owner: Id) -> RepositoryResult<Vec<Task>> {
        Ok(self.sorted(|t| t.is_owned_by(owner)).await)
    }

    async fn page_visible(&self, user_id: Id, params: PageParams) -> RepositoryResult<Page<Task>> {
        let tasks = self.sorted(|t| t.is_visible_to(user_id)).await;
        Ok(Page::from_vec(tasks, params))
    }

    async fn list_involving(&self, user_id: Id, email: &str) -> RepositoryResult<Vec<Task>> {
        Ok(self
            .sorted(|t| t.involves_user(user_id) || t.involves_email(email))
            .await)
    }

    async fn list_by_delegate_email(&self, email: &str) -> RepositoryResult<Vec<Task>> {
        Ok(self.sorted(|t| t.involves_email(email)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;
    use va_models::{Priority, TaskStatus};

    fn delegate(email: &str, user_id: Option<Id>) -> Delegate {
        Delegate {
            user_id,
            name: None,
            email: email.into(),
        }
    }

    fn task(owner: Id, title: &str, due_in_days: i64, delegates: Vec<Delegate>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: title.into(),
            description: "d".into(),
            due_date: now + Duration::days(due_in_days),
            delegate: delegates,
            priority: Priority::Medium,
            status: TaskStatus::Pending,
            user_id: owner,
            sub_tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_page_visible_includes_delegated() {
        let store = MemoryTaskStore::new();
        let owner = Uuid::new_v4();
        let helper = Uuid::new_v4();

        store.insert(task(owner, "later", 5, vec![])).await.unwrap();
        store
            .insert(task(owner, "sooner", 1, vec![delegate("h@x.com", Some(helper))]))
            .await
            .unwrap();
        store.insert(task(Uuid::new_v4(), "foreign", 2, vec![])).await.unwrap();

        let page = store.page_visible(owner, PageParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].title, "sooner");

        let page = store.page_visible(helper, PageParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_find_by_subtask_and_involving() {
        let store = MemoryTaskStore::new();
        let owner = Uuid::new_v4();
        let mut t = task(owner, "parent", 3, vec![]);
        let sub = Subtask {
            id: Uuid::new_v4(),
            title: "child".into(),
            description: "c".into(),
            due_date: t.due_date,
            delegate: vec![delegate("sub@x.com", None)],
            priority: Priority::Low,
            status: TaskStatus::Pending,
        };
        t.sub_tasks.push(sub.clone());
        let t = store.insert(t).await.unwrap();

        let parent = store.find_by_subtask_id(sub.id).await.unwrap().unwrap();
        assert_eq!(parent.id, t.id);

        let involving = store.list_involving(Uuid::new_v4(), "SUB@x.com").await.unwrap();
        assert_eq!(involving.len(), 1);

        let by_email = store.list_by_delegate_email("sub@x.com").await.unwrap();
        assert_eq!(by_email.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryTaskStore::new();
        let owner = Uuid::new_v4();
        let mut t = store.insert(task(owner, "draft", 1, vec![])).await.unwrap();

        t.status = TaskStatus::Completed;
        store.update(&t).await.unwrap();
        let stored = store.find_by_id(t.id).await.unwrap().unwrap();
        assert!(stored.status.is_completed());

        assert!(store.delete(t.id).await.unwrap());
        assert!(!store.delete(t.id).await.unwrap());
        assert!(matches!(store.update(&t).await, Err(RepositoryError::NotFound(_))));
    }
}
