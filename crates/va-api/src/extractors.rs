//! Axum extractors and shared state for API handlers

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use va_auth::{extract_cookie, extract_request_token, RESET_COOKIE};
use va_core::Id;
use va_services::{
    ContactService, DocumentService, EventService, NoteService, ProfileService, ServiceContext,
    TaskService, UserService, VisitorService,
};

use crate::error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub ctx: ServiceContext,
}

impl AppState {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.ctx.clone())
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(self.ctx.clone())
    }

    pub fn events(&self) -> EventService {
        EventService::new(self.ctx.clone())
    }

    pub fn documents(&self) -> DocumentService {
        DocumentService::new(self.ctx.clone())
    }

    pub fn contacts(&self) -> ContactService {
        ContactService::new(self.ctx.clone())
    }

    pub fn visitors(&self) -> VisitorService {
        VisitorService::new(self.ctx.clone())
    }

    pub fn notes(&self) -> NoteService {
        NoteService::new(self.ctx.clone())
    }

    pub fn profile(&self) -> ProfileService {
        ProfileService::new(self.ctx.clone())
    }
}

/// Authenticated user extractor
///
/// Takes the session token from the `token` cookie, falling back to an
/// `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Id);

impl AuthenticatedUser {
    pub fn id(&self) -> Id {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = extract_request_token(
            header_str(&parts.headers, header::COOKIE),
            header_str(&parts.headers, header::AUTHORIZATION),
        )
        .ok_or_else(|| ApiError::unauthorized("Unauthorized - No token provided"))?;

        match app_state.ctx.jwt.get_user_id(&token) {
            Ok(user_id) => Ok(AuthenticatedUser(user_id)),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                Err(ApiError::forbidden("Unauthorized - Invalid or expired token"))
            }
        }
    }
}

/// The `resetToken` cookie, if the client sent one
pub struct ResetCookie(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ResetCookie
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ResetCookie(
            header_str(&parts.headers, header::COOKIE).and_then(|c| extract_cookie(c, RESET_COOKIE)),
        ))
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
