//! Smart space handlers
//!
//! What a delegate sees of other people's work. Logout lives with the
//! account handlers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use va_contracts::tasks::DelegateStatusInput;
use va_core::parse_id;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// GET /profile/supervisors/:email
pub async fn supervisors(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(email): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let groups = state.profile().supervisors(&email).await?;
    Ok(Json(json!({ "count": groups.len(), "supervisors": groups })))
}

/// PATCH /profile/task/status/:taskId
pub async fn update_task_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
    Json(body): Json<DelegateStatusInput>,
) -> ApiResult<impl IntoResponse> {
    let task_id = parse_id(&raw, "task")?;
    let task = state.profile().update_status(user.id(), task_id, body).await?;
    Ok(Json(json!({ "message": "Status updated successfully", "task": task })))
}

/// GET /profile/events/member/:email
///
/// Always answers for the caller's own address; the path segment is kept
/// for client compatibility.
pub async fn member_events(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(_email): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.profile().member_events(user.id()).await?))
}

/// DELETE /profile/notification/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "notification")?;
    state.profile().delete_notification(user.id(), id).await?;
    Ok(Json(json!({ "message": "Notification deleted successfully" })))
}
