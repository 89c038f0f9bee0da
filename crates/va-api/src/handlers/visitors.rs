//! Visitor log handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use va_contracts::visitors::VisitorInput;
use va_core::parse_id;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser};

/// POST /visitors
pub async fn create_visitor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<VisitorInput>,
) -> ApiResult<impl IntoResponse> {
    let visitor = state.visitors().create(user.id(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Visitor created successfully", "visitor": visitor })),
    ))
}

/// PUT /visitors/:id
pub async fn update_visitor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
    Json(body): Json<VisitorInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "visitor")?;
    let visitor = state.visitors().update(user.id(), id, body).await?;
    Ok(Json(json!({ "message": "Visitor updated successfully", "visitor": visitor })))
}

/// GET /visitors/getVisitors
pub async fn list_visitors(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let visitors = state.visitors().list(user.id()).await?;
    Ok(Json(json!({
        "message": "Visitors fetched successfully",
        "total": visitors.len(),
        "visitors": visitors,
    })))
}

/// GET /visitors/:id
pub async fn get_visitor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "visitor")?;
    let visitor = state.visitors().get(user.id(), id).await?;
    Ok(Json(json!({ "message": "Visitor retrieved successfully", "visitor": visitor })))
}

/// GET /visitors/name/:name
pub async fn by_name(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let visitors = state.visitors().find_by_name(user.id(), &name).await?;
    Ok(Json(json!({
        "message": format!("Visitors with name \"{}\" retrieved successfully", name.trim()),
        "visitors": visitors,
    })))
}

/// GET /visitors/day/:day
pub async fn by_day(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(day): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let visitors = state.visitors().on_day(user.id(), &day).await?;
    // on_day already rejected anything unparsable
    let label = NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d")
        .map(|d| d.format("%a %b %d %Y").to_string())
        .unwrap_or(day);
    Ok(Json(json!({
        "message": format!("Visitors for the day {} fetched successfully", label),
        "visitors": visitors,
    })))
}

/// GET /visitors/month/:month
pub async fn by_month(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let month: u32 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid month"))?;
    let visitors = state.visitors().in_month(user.id(), month).await?;
    Ok(Json(json!({
        "message": format!("Visitors for month {} fetched successfully", month),
        "visitors": visitors,
    })))
}

/// GET /visitors/week
pub async fn this_week(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let visitors = state.visitors().this_week(user.id()).await?;
    Ok(Json(json!({ "message": "Visitors for the week fetched successfully", "visitors": visitors })))
}

/// DELETE /visitors/:id
pub async fn delete_visitor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "visitor")?;
    let visitor = state.visitors().get(user.id(), id).await?;
    state.visitors().delete(user.id(), id).await?;
    Ok(Json(json!({ "message": "Visitor deleted successfully", "visitor": visitor })))
}
