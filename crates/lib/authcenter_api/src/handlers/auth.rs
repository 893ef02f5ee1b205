//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use authcenter_core::models::auth::TokenPair;

use crate::AppState;
use crate::error::AppResult;
use crate::extractors::{BearerToken, OptionalJson, ValidatedJson};
use crate::models::{LoginRequest, RefreshTokenBody, StatusResponse};
use crate::services::auth;

/// `POST /auth/login`: issue a token pair for a directory user.
pub async fn login_handler(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let pair = auth::login(&state.auth, &body.username).await?;
    Ok(Json(pair))
}

/// `POST /auth/refresh`: rotate a refresh token presented as
/// `Authorization: Bearer <refreshToken>` or as `{"refreshToken": ...}`.
pub async fn refresh_handler(
    State(state): State<AppState>,
    BearerToken(bearer): BearerToken,
    OptionalJson(body): OptionalJson<RefreshTokenBody>,
) -> AppResult<Json<TokenPair>> {
    let body_token = body.and_then(|b| b.refresh_token);
    let pair = auth::refresh(&state.auth, bearer.as_deref(), body_token.as_deref()).await?;
    Ok(Json(pair))
}

/// `POST /auth/logout`: revoke the bearer access token, plus the refresh
/// token in the body if one is given.
pub async fn logout_handler(
    State(state): State<AppState>,
    BearerToken(bearer): BearerToken,
    OptionalJson(body): OptionalJson<RefreshTokenBody>,
) -> AppResult<Json<StatusResponse>> {
    let refresh_token = body.and_then(|b| b.refresh_token);
    auth::logout(&state.auth, bearer.as_deref(), refresh_token.as_deref()).await?;
    Ok(Json(StatusResponse::ok("Logged out")))
}
