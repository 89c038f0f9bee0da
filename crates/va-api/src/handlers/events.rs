//! Event handlers
//!
//! `/events/*`: calendar CRUD with busy-time checks, the dashboard
//! notification feed and busy slots.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use va_contracts::events::{EventInput, RangeQuery};
use va_core::parse_id;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// POST /events
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<EventInput>,
) -> ApiResult<impl IntoResponse> {
    let event = state.events().create(user.id(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Event created successfully", "event": event })),
    ))
}

/// GET /events/allEvents?start&end
pub async fn events_in_range(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<RangeQuery>,
) -> ApiResult<impl IntoResponse> {
    let (events, total) = state.events().list_range(user.id(), &query).await?;
    Ok(Json(json!({
        "message": "All events retrieved successfully",
        "totalEvents": total,
        "events": events,
    })))
}

/// GET /events
pub async fn list_events(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let events = state.events().list(user.id()).await?;
    if events.is_empty() {
        return Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "message": "No events found for the user" })),
        ));
    }
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Events retrieved successfully", "events": events })),
    ))
}

/// GET /events/:id
pub async fn get_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "event")?;
    let event = state.events().get(user.id(), id).await?;
    Ok(Json(json!({
        "message": format!("Event with ID {} retrieved successfully", id),
        "event": event,
    })))
}

/// GET /events/eventName/:name
pub async fn event_by_name(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let event = state.events().find_by_name(user.id(), &name).await?;
    Ok(Json(json!({
        "message": format!("Event with name {} retrieved successfully", name),
        "event": event,
    })))
}

/// GET /events/events4DDay
pub async fn events_today(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let events = state.events().today(user.id()).await?;
    Ok(Json(json!({ "message": "Today's events retrieved successfully", "events": events })))
}

/// PUT /events/:id
pub async fn update_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
    Json(body): Json<EventInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "event")?;
    let event = state.events().update(user.id(), id, body).await?;
    Ok(Json(json!({ "message": "Event updated successfully", "event": event })))
}

/// DELETE /events/:id
pub async fn cancel_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "event")?;
    let event = state.events().cancel(user.id(), id).await?;
    Ok(Json(json!({ "message": format!("{} deleted successfully", event.title) })))
}

/// GET /events/notify
pub async fn notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let notifications = state.events().notifications(user.id()).await?;
    Ok(Json(json!({
        "message": "Dashboard notifications retrieved successfully",
        "notifications": notifications,
    })))
}

/// GET /events/busy/busyTime
pub async fn busy_times(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let busy_times = state.events().busy_times(user.id()).await?;
    Ok(Json(json!({ "message": "Busy times retrieved successfully", "busyTimes": busy_times })))
}
