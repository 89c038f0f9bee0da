//! Document register store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use va_core::{Id, Owned, Page, PageParams};
use va_models::{Document, DocumentResponse, ResponseStatus};

use crate::memory::MemoryTable;
use crate::repository::{contains_ci, like_pattern, parse_column, RepositoryError, RepositoryResult};

const DOCUMENT_COLUMNS: &str = "id, title, description, category, sender, ref, doc_type, reception_mode, \
     file_category, response_status, responses, user_id, created_at, updated_at";

/// Document database entity
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub category: String,
    pub sender: String,
    #[sqlx(rename = "ref")]
    pub reference: Option<String>,
    pub doc_type: String,
    pub reception_mode: String,
    pub file_category: Option<String>,
    pub response_status: String,
    pub responses: Json<Vec<DocumentResponse>>,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = RepositoryError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            sender: row.sender,
            reference: row.reference,
            doc_type: parse_column(&row.doc_type)?,
            reception_mode: parse_column(&row.reception_mode)?,
            file_category: row.file_category,
            response_status: parse_column(&row.response_status)?,
            responses: row.responses.0,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Register filters; text fields are substring matches unless noted
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub title: Option<String>,
    /// Exact, case-insensitive
    pub reference: Option<String>,
    pub category: Option<String>,
    pub sender: Option<String>,
    /// Exact
    pub file_category: Option<String>,
    /// Exact
    pub reception_mode: Option<String>,
    /// `Some(true)` only responded documents, `Some(false)` everything else
    pub responded: Option<bool>,
}

impl DocumentFilter {
    fn matches(&self, doc: &Document) -> bool {
        let substring = |filter: &Option<String>, value: &str| {
            filter.as_deref().map_or(true, |f| contains_ci(value, f))
        };
        substring(&self.title, &doc.title)
            && substring(&self.category, &doc.category)
            && substring(&self.sender, &doc.sender)
            && self.reference.as_deref().map_or(true, |r| {
                doc.reference
                    .as_deref()
                    .is_some_and(|d| d.eq_ignore_ascii_case(r))
            })
            && self
                .file_category
                .as_deref()
                .map_or(true, |f| doc.file_category.as_deref() == Some(f))
            && self
                .reception_mode
                .as_deref()
                .map_or(true, |m| doc.reception_mode.as_str() == m)
            && self.responded.map_or(true, |r| doc.is_responded() == r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Sender,
    Category,
    Reference,
    DocType,
    ReceptionMode,
    ResponseStatus,
}

impl SortField {
    /// Accepts the JSON field names; unknown names fall back to `createdAt`
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "updatedAt" => SortField::UpdatedAt,
            "title" => SortField::Title,
            "sender" => SortField::Sender,
            "category" => SortField::Category,
            "ref" => SortField::Reference,
            "type" => SortField::DocType,
            "receptionMode" => SortField::ReceptionMode,
            "responseStatus" => SortField::ResponseStatus,
            _ => SortField::CreatedAt,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::Sender => "sender",
            SortField::Category => "category",
            SortField::Reference => "ref",
            SortField::DocType => "doc_type",
            SortField::ReceptionMode => "reception_mode",
            SortField::ResponseStatus => "response_status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for DocumentSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl DocumentSort {
    /// Parse `field:dir` where dir is `asc`, `desc`, `1` or `-1`
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::default();
        };
        let (field, dir) = raw.split_once(':').unwrap_or((raw, "asc"));
        let dir = dir.trim().to_lowercase();
        Self {
            field: SortField::from_name(field),
            descending: dir == "desc" || dir == "-1",
        }
    }

    fn compare(&self, a: &Document, b: &Document) -> std::cmp::Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Sender => a.sender.cmp(&b.sender),
            SortField::Category => a.category.cmp(&b.category),
            SortField::Reference => a.reference.cmp(&b.reference),
            SortField::DocType => a.doc_type.as_str().cmp(b.doc_type.as_str()),
            SortField::ReceptionMode => a.reception_mode.as_str().cmp(b.reception_mode.as_str()),
            SortField::ResponseStatus => a.response_status.as_str().cmp(b.response_status.as_str()),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Conflict` when `ref` is already used
    async fn insert(&self, document: Document) -> RepositoryResult<Document>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Document>>;

    async fn update(&self, document: &Document) -> RepositoryResult<Document>;

    async fn delete(&self, id: Id) -> RepositoryResult<bool>;

    /// Whether another document already uses `reference`
    async fn reference_taken(&self, reference: &str, exclude: Option<Id>) -> RepositoryResult<bool>;

    async fn search(
        &self,
        owner: Id,
        filter: &DocumentFilter,
        sort: DocumentSort,
        params: PageParams,
    ) -> RepositoryResult<Page<Document>>;
}

/// Postgres document store
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, owner: Id, filter: &DocumentFilter) {
    qb.push(" WHERE user_id = ").push_bind(owner);
    for (column, value) in [
        ("title", &filter.title),
        ("category", &filter.category),
        ("sender", &filter.sender),
    ] {
        if let Some(value) = value {
            qb.push(format!(" AND {} ILIKE ", column))
                .push_bind(like_pattern(value));
        }
    }
    if let Some(reference) = &filter.reference {
        qb.push(" AND LOWER(ref) = LOWER(")
            .push_bind(reference.clone())
            .push(")");
    }
    if let Some(file_category) = &filter.file_category {
        qb.push(" AND file_category = ").push_bind(file_category.clone());
    }
    if let Some(mode) = &filter.reception_mode {
        qb.push(" AND reception_mode = ").push_bind(mode.clone());
    }
    match filter.responded {
        Some(true) => {
            qb.push(" AND response_status = ")
                .push_bind(ResponseStatus::Responded.as_str());
        }
        Some(false) => {
            qb.push(" AND response_status <> ")
                .push_bind(ResponseStatus::Responded.as_str());
        }
        None => {}
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, document: Document) -> RepositoryResult<Document> {
        let sql = format!(
            r#"
            INSERT INTO documents ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS, DOCUMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(document.id)
            .bind(&document.title)
            .bind(&document.description)
            .bind(&document.category)
            .bind(&document.sender)
            .bind(&document.reference)
            .bind(document.doc_type.as_str())
            .bind(document.reception_mode.as_str())
            .bind(&document.file_category)
            .bind(document.response_status.as_str())
            .bind(Json(&document.responses))
            .bind(document.user_id)
            .bind(document.created_at)
            .bind(document.updated_at)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Document>> {
        let sql = format!("SELECT {} FROM documents WHERE id = $1", DOCUMENT_COLUMNS);
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Document::try_from).transpose()
    }

    async fn update(&self, document: &Document) -> RepositoryResult<Document> {
        let sql = format!(
            r#"
            UPDATE documents
            SET title = $2, description = $3, category = $4, sender = $5, ref = $6,
                doc_type = $7, reception_mode = $8, file_category = $9,
                response_status = $10, responses = $11, updated_at = $12
            WHERE id = $1
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(document.id)
            .bind(&document.title)
            .bind(&document.description)
            .bind(&document.category)
            .bind(&document.sender)
            .bind(&document.reference)
            .bind(document.doc_type.as_str())
            .bind(document.reception_mode.as_str())
            .bind(&document.file_category)
            .bind(document.response_status.as_str())
            .bind(Json(&document.responses))
            .bind(document.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| RepositoryError::NotFound("Document".into()))?
            .try_into()
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reference_taken(&self, reference: &str, exclude: Option<Id>) -> RepositoryResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM documents
                WHERE ref = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(reference)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn search(
        &self,
        owner: Id,
        filter: &DocumentFilter,
        sort: DocumentSort,
        params: PageParams,
    ) -> RepositoryResult<Page<Document>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents");
        push_filters(&mut count, owner, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM documents", DOCUMENT_COLUMNS));
        push_filters(&mut select, owner, filter);
        select
            .push(format!(
                " ORDER BY {} {}, id ASC LIMIT ",
                sort.field.column(),
                if sort.descending { "DESC" } else { "ASC" }
            ))
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset());
        let rows = select.build_query_as::<DocumentRow>().fetch_all(&self.pool).await?;

        let items = rows
            .into_iter()
            .map(Document::try_from)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(Page::new(items, total, params))
    }
}

/// In-memory document store
#[derive(Default)]
pub struct MemoryDocumentStore {
    table: MemoryTable<Document>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_reference(a: &Document, b: &Document) -> bool {
    matches!((&a.reference, &b.reference), (Some(x), Some(y)) if x == y)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, document: Document) -> RepositoryResult<Document> {
        let candidate = document.clone();
        self.table
            .insert_unique(document, "documents_ref_key", |d| same_reference(d, &candidate))
            .await
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Document>> {
        Ok(self.table.get(id).await)
    }

    async fn update(&self, document: &Document) -> RepositoryResult<Document> {
        let found = self
            .table
            .replace_unique(document.clone(), "documents_ref_key", |d| same_reference(d, document))
            .await?;
        if !found {
            return Err(RepositoryError::NotFound("Document".into()));
        }
        Ok(document.clone())
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.table.remove(id).await.is_some())
    }

    async fn reference_taken(&self, reference: &str, exclude: Option<Id>) -> RepositoryResult<bool> {
        Ok(self
            .table
            .any(|d| d.reference.as_deref() == Some(reference) && Some(d.id) != exclude)
            .await)
    }

    async fn search(
        &self,
        owner: Id,
        filter: &DocumentFilter,
        sort: DocumentSort,
        params: PageParams,
    ) -> RepositoryResult<Page<Document>> {
        let mut docs = self
            .table
            .filter(|d| d.is_owned_by(owner) && filter.matches(d))
            .await;
        docs.sort_by(|a, b| sort.compare(a, b));
        Ok(Page::from_vec(docs, params))
    }
}
