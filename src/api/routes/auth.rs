//! Account endpoints under `/main/auth`

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::error::{ApiError, JsonBody};
use crate::api::server::AppState;
use crate::auth::models::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};
use crate::auth::CurrentUser;

use super::ApiResponse;

const RESET_REQUESTED: &str = "If an account with this email exists, a reset link has been sent.";

#[derive(Debug, Serialize)]
struct ResetRequestedBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_token: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.accounts.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Registration successful", response)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.accounts.login(req).await?;
    Ok(Json(ApiResponse::with_message("Login successful", response)))
}

pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let info = state.accounts.profile(user).await?;
    Ok(Json(ApiResponse::ok(info)))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let requested = state.accounts.forgot_password(req).await?;
    Ok(Json(ApiResponse::with_message(
        RESET_REQUESTED,
        ResetRequestedBody {
            debug_token: requested.debug_token,
        },
    )))
}

pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.accounts.reset_password(req).await?;
    Ok(Json(ApiResponse::message("Password has been reset successfully")))
}
