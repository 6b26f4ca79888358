use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{LoginRequest, RegisterRequest},
    handlers::service_failure,
    middleware::CurrentUser,
    utils::ValidatedJson,
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth_service
        .register(req)
        .await
        .map_err(service_failure)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state
        .auth_service
        .login(&req.username, req.password)
        .await
        .map_err(service_failure)?;
    Ok(Json(token))
}

/// Revoke the caller's current token.
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    state
        .auth_service
        .logout(user.id)
        .await
        .map_err(service_failure)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user)
}
