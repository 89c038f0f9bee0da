//! Note handlers
//!
//! Single-note endpoints answer with the bare note, matching what the
//! editor front end reads.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use va_contracts::visitors::NoteInput;
use va_core::parse_id;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// POST /notes/createnote
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<NoteInput>,
) -> ApiResult<impl IntoResponse> {
    let note = state.notes().create(user.id(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Note created successfully", "note": note })),
    ))
}

/// GET /notes/getallnotes
pub async fn list_notes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let notes = state.notes().list(user.id()).await?;
    Ok(Json(json!({
        "message": "Notes fetched successfully",
        "totalNotes": notes.len(),
        "notes": notes,
    })))
}

/// PUT /notes/editnote/:id
pub async fn edit_note(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
    Json(body): Json<NoteInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "note")?;
    Ok(Json(state.notes().edit(user.id(), id, body).await?))
}

/// DELETE /notes/deletenote/:id
pub async fn delete_note(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "note")?;
    state.notes().delete(user.id(), id).await?;
    Ok(Json(json!({ "message": "Note deleted successfully" })))
}

/// GET /notes/findnote/:title
pub async fn find_by_title(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(title): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.notes().find_by_title(user.id(), &title).await?))
}

/// GET /notes/findnotebyid/:id
pub async fn find_by_id(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "note")?;
    Ok(Json(state.notes().get(user.id(), id).await?))
}
