//! Document register handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use va_contracts::documents::{DocumentInput, DocumentQuery, ResponseInput};
use va_core::parse_id;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// GET /document/getAllDocuments
pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<DocumentQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state.documents().list(user.id(), &query).await?;
    Ok(Json(json!({
        "message": "Documents retrieved successfully",
        "data": page.items,
        "total": page.total,
        "page": page.page,
        "pages": page.total_pages(),
        "limit": page.limit,
    })))
}

/// GET /document/:id
pub async fn get_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "document")?;
    let document = state.documents().get(user.id(), id).await?;
    Ok(Json(json!({ "message": "Document retrieved successfully", "data": document })))
}

/// POST /document
pub async fn create_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<DocumentInput>,
) -> ApiResult<impl IntoResponse> {
    let document = state.documents().create(user.id(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Document created successfully", "data": document })),
    ))
}

/// PUT /document/:id
pub async fn update_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
    Json(body): Json<DocumentInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "document")?;
    let document = state.documents().update(user.id(), id, body).await?;
    Ok(Json(json!({ "message": "Document updated successfully", "data": document })))
}

/// DELETE /document/:id
pub async fn delete_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "document")?;
    state.documents().delete(user.id(), id).await?;
    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

/// POST /document/response/:id
pub async fn add_response(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
    Json(body): Json<ResponseInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "document")?;
    let document = state.documents().add_response(user.id(), id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Response added successfully", "data": document })),
    ))
}
