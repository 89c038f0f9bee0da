//! Account handlers
//!
//! `/user/*` plus the profile logout. Registration, verification, login and
//! the reset flow are public; the rest need a session.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use va_auth::CookieConfig;
use va_contracts::users::{EmailInput, LoginInput, RegisterInput, ResetPasswordInput, TokenInput, UpdateUserInput};

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser, ResetCookie};

fn session_cookie(state: &AppState) -> CookieConfig {
    let auth = &state.ctx.auth;
    CookieConfig::session(auth.token_ttl_seconds, auth.cookie_secure)
}

fn reset_cookie(state: &AppState) -> CookieConfig {
    let auth = &state.ctx.auth;
    CookieConfig::reset(auth.reset_token_ttl_seconds, auth.cookie_secure)
}

/// POST /user/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users().register(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully. Verification email sent.",
            "user": {
                "_id": user.id,
                "userName": user.user_name,
                "email": user.email,
                "fullName": user.full_name,
                "verified": user.verified,
            }
        })),
    ))
}

/// POST /user/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<TokenInput>,
) -> ApiResult<impl IntoResponse> {
    let session = state.users().verify_email(body).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state).build_cookie(&session.token))],
        Json(json!({ "success": true, "message": "Email verified successfully" })),
    ))
}

/// POST /user/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> ApiResult<impl IntoResponse> {
    let session = state.users().login(body).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state).build_cookie(&session.token))],
        Json(json!({
            "success": true,
            "message": "Login successful",
            "token": session.token,
            "user": {
                "_id": session.user.id,
                "email": session.user.email,
                "userName": session.user.user_name,
            }
        })),
    ))
}

/// POST /profile/logout
pub async fn logout(State(state): State<AppState>, _user: AuthenticatedUser) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state).build_clear_cookie())],
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
}

/// POST /user/request-reset-password
pub async fn request_reset_password(
    State(state): State<AppState>,
    Json(body): Json<EmailInput>,
) -> ApiResult<impl IntoResponse> {
    state.users().request_password_reset(body).await?;
    Ok(Json(json!({ "success": true, "message": "Reset email sent" })))
}

/// POST /user/confirm-reset-token
pub async fn confirm_reset_token(
    State(state): State<AppState>,
    Json(body): Json<TokenInput>,
) -> ApiResult<impl IntoResponse> {
    let token = state.users().confirm_reset_token(body).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, reset_cookie(&state).build_cookie(&token))],
        Json(json!({
            "success": true,
            "message": "Token confirmed. Proceed to reset password."
        })),
    ))
}

/// POST /user/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ResetCookie(cookie): ResetCookie,
    Json(body): Json<ResetPasswordInput>,
) -> ApiResult<impl IntoResponse> {
    state.users().reset_password(cookie.as_deref(), body).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, reset_cookie(&state).build_clear_cookie())],
        Json(json!({ "success": true, "message": "Password reset successfully" })),
    ))
}

/// GET /user/getUser
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let user = state.users().get(user.id()).await?;
    Ok(Json(json!({ "user": user })))
}

/// PUT /user/updateUser
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateUserInput>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users().update(user.id(), body).await?;
    Ok(Json(json!({ "message": "User updated successfully", "user": user })))
}
