//! Contact handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use va_contracts::contacts::ContactInput;
use va_core::parse_id;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// GET /contact/getAllContacts
pub async fn list_contacts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let contacts = state.contacts().list(user.id()).await?;
    let message = if contacts.is_empty() {
        "No contacts found for this user".to_string()
    } else {
        format!("Found {} contacts", contacts.len())
    };
    Ok(Json(json!({
        "message": message,
        "totalContacts": contacts.len(),
        "contacts": contacts,
    })))
}

/// GET /contact/:id
pub async fn get_contact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "contact")?;
    let contact = state.contacts().get(user.id(), id).await?;
    Ok(Json(json!({ "message": "Contact retrieved successfully", "data": contact })))
}

/// POST /contact
pub async fn create_contact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ContactInput>,
) -> ApiResult<impl IntoResponse> {
    let name = body.name.clone().unwrap_or_default();
    let contact = state.contacts().create(user.id(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": format!("{} added successfully", name.trim()), "data": contact })),
    ))
}

/// PUT /contact/:id
pub async fn update_contact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
    Json(body): Json<ContactInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "contact")?;
    let contact = state.contacts().update(user.id(), id, body).await?;
    Ok(Json(json!({
        "message": format!("{} updated successfully", contact.name),
        "data": contact,
    })))
}

/// DELETE /contact/:id
pub async fn delete_contact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&raw, "contact")?;
    state.contacts().delete(user.id(), id).await?;
    Ok(Json(json!({ "message": "Contact deleted successfully" })))
}

/// GET /contact/company/:companyName
pub async fn by_company(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(company): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let contacts = state.contacts().search_company(user.id(), &company).await?;
    Ok(Json(json!({
        "message": format!("Found {} contact(s)", contacts.len()),
        "data": contacts,
    })))
}

/// GET /contact/name/:name
pub async fn by_name(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let contacts = state.contacts().search_name(user.id(), &name).await?;
    Ok(Json(json!({
        "message": format!("Found {} contact(s)", contacts.len()),
        "data": contacts,
    })))
}
