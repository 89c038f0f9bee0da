//! Document register with responses

use chrono::Utc;
use va_contracts::documents::{
    AddResponseContract, CreateDocumentContract, DocumentInput, DocumentQuery, ResponseInput,
    UpdateDocumentContract,
};
use va_contracts::{is_truthy, Contract};
use va_core::types::parse_datetime;
use va_core::{Id, Owned, Page, PageParams, VaError, VaResult};
use va_db::{DocumentFilter, DocumentSort};
use va_models::document::DEFAULT_CATEGORY;
use va_models::{Document, DocumentResponse, DocumentType, ReceptionMode, ResponseStatus};

use crate::context::ServiceContext;

pub const DEFAULT_DOCUMENT_PAGE_SIZE: i64 = 30;

/// One page of the register
pub type DocumentList = Page<Document>;

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn reception_mode(raw: Option<&str>) -> VaResult<ReceptionMode> {
    raw.unwrap_or_default()
        .parse()
        .map_err(|_| VaError::invalid("receptionMode must be virtual or in-person"))
}

/// Build a stored response; the type falls back to outgoing
fn to_response(input: &ResponseInput) -> VaResult<DocumentResponse> {
    let mode = reception_mode(input.reception_mode.as_deref())?;
    Ok(DocumentResponse {
        title: input.title.as_deref().unwrap_or_default().trim().to_string(),
        reference: non_blank(input.reference.as_deref()),
        summary: input.summary.as_deref().unwrap_or_default().trim().to_string(),
        res_status: input.res_status.as_ref().is_some_and(is_truthy),
        reception_mode: mode,
        file_category: if mode.requires_file_category() {
            non_blank(input.file_category.as_deref())
        } else {
            None
        },
        doc_type: input
            .doc_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DocumentType::Outgoing),
        responded_at: input
            .responded_at
            .as_deref()
            .and_then(parse_datetime)
            .unwrap_or_else(Utc::now),
    })
}

/// Responses are kept only for responded documents
fn to_responses(input: &DocumentInput, status: ResponseStatus) -> VaResult<Vec<DocumentResponse>> {
    if status != ResponseStatus::Responded {
        return Ok(Vec::new());
    }
    input
        .responses
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(to_response)
        .collect()
}

/// Store filter for the list query; blank values are ignored
fn document_filter(query: &DocumentQuery) -> DocumentFilter {
    let responded = match query.status.as_deref().map(str::trim) {
        Some("responded") => Some(true),
        Some("pending") | Some("unresponded") | Some("not-responded") => Some(false),
        _ => None,
    };
    DocumentFilter {
        title: non_blank(query.title.as_deref()),
        reference: non_blank(query.reference.as_deref()),
        category: non_blank(query.category.as_deref()),
        sender: non_blank(query.sender.as_deref()),
        file_category: non_blank(query.file_category.as_deref()),
        reception_mode: non_blank(query.reception_mode.as_deref()),
        responded,
    }
}

pub struct DocumentService {
    ctx: ServiceContext,
}

impl DocumentService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    async fn owned(&self, owner: Id, id: Id) -> VaResult<Document> {
        self.ctx
            .stores
            .documents
            .find_by_id(id)
            .await?
            .filter(|d| d.is_owned_by(owner))
            .ok_or_else(|| VaError::not_found("Document not found or not authorized"))
    }

    pub async fn list(&self, owner: Id, query: &DocumentQuery) -> VaResult<DocumentList> {
        let number = |raw: &Option<String>| raw.as_deref().and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v > 0);
        let params = PageParams::from_query(number(&query.page), number(&query.limit), DEFAULT_DOCUMENT_PAGE_SIZE);
        let filter = document_filter(query);
        let sort = DocumentSort::parse(query.sort.as_deref());
        Ok(self.ctx.stores.documents.search(owner, &filter, sort, params).await?)
    }

    pub async fn get(&self, owner: Id, id: Id) -> VaResult<Document> {
        self.owned(owner, id).await
    }

    pub async fn create(&self, owner: Id, input: DocumentInput) -> VaResult<Document> {
        CreateDocumentContract.validate(&input)?;
        let reference = non_blank(input.reference.as_deref());
        if let Some(reference) = reference.as_deref() {
            if self.ctx.stores.documents.reference_taken(reference, None).await? {
                return Err(VaError::conflict("Document with this reference already exists"));
            }
        }

        let mode = reception_mode(input.reception_mode.as_deref())?;
        let status = input.response_status().unwrap_or_default();
        let now = Utc::now();
        let document = Document {
            id: uuid::Uuid::new_v4(),
            title: input.title.as_deref().unwrap_or_default().trim().to_string(),
            description: input.description.as_deref().unwrap_or_default().trim().to_string(),
            category: non_blank(input.category.as_deref()).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            sender: input.sender.as_deref().unwrap_or_default().trim().to_string(),
            reference,
            doc_type: input
                .doc_type
                .as_deref()
                .unwrap_or_default()
                .parse()
                .map_err(|_| VaError::invalid("type must be incoming or outgoing"))?,
            reception_mode: mode,
            file_category: if mode.requires_file_category() {
                non_blank(input.file_category.as_deref())
            } else {
                None
            },
            response_status: status,
            responses: to_responses(&input, status)?,
            user_id: owner,
            created_at: now,
            updated_at: now,
        };
        let document = self.ctx.stores.documents.insert(document).await?;
        tracing::info!(document_id = %document.id, %owner, "Document filed");
        Ok(document)
    }

    pub async fn update(&self, owner: Id, id: Id, input: DocumentInput) -> VaResult<Document> {
        UpdateDocumentContract.validate(&input)?;
        let mut document = self.owned(owner, id).await?;

        let reference = non_blank(input.reference.as_deref());
        if let Some(reference) = reference.as_deref() {
            if self.ctx.stores.documents.reference_taken(reference, Some(id)).await? {
                return Err(VaError::conflict("Document with this reference already exists"));
            }
        }

        document.title = input.title.as_deref().unwrap_or_default().trim().to_string();
        document.description = input.description.as_deref().unwrap_or_default().trim().to_string();
        document.sender = input.sender.as_deref().unwrap_or_default().trim().to_string();
        if let Some(category) = non_blank(input.category.as_deref()) {
            document.category = category;
        }
        document.reference = reference;
        if let Ok(doc_type) = input.doc_type.as_deref().unwrap_or_default().parse() {
            document.doc_type = doc_type;
        }
        if input.reception_mode.is_some() {
            let mode = reception_mode(input.reception_mode.as_deref())?;
            document.reception_mode = mode;
            if mode.requires_file_category() {
                document.file_category = non_blank(input.file_category.as_deref());
            }
        }
        if let Some(status) = input.response_status() {
            document.response_status = status;
        }
        document.responses = to_responses(&input, document.response_status)?;
        document.updated_at = Utc::now();

        Ok(self.ctx.stores.documents.update(&document).await?)
    }

    pub async fn delete(&self, owner: Id, id: Id) -> VaResult<()> {
        self.owned(owner, id).await?;
        self.ctx.stores.documents.delete(id).await?;
        tracing::info!(document_id = %id, "Document deleted");
        Ok(())
    }

    /// Append a response and mark the document responded
    pub async fn add_response(&self, owner: Id, id: Id, input: ResponseInput) -> VaResult<Document> {
        AddResponseContract.validate(&input)?;
        let mut document = self.owned(owner, id).await?;
        document.responses.push(to_response(&input)?);
        document.response_status = ResponseStatus::Responded;
        document.updated_at = Utc::now();
        Ok(self.ctx.stores.documents.update(&document).await?)
    }
}
