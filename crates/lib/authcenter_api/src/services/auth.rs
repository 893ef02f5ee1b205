//! Authentication service: login, refresh and logout flows delegating to
//! [`AuthCenter`].

use authcenter_core::models::auth::TokenPair;
use authcenter_core::{AuthCenter, AuthError, ErrorCode};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Issue a token pair for `username`. Unknown users get
/// [`AppError::InvalidCredentials`].
pub async fn login(auth: &AuthCenter, username: &str) -> AppResult<TokenPair> {
    match auth.login(username).await {
        Ok(pair) => Ok(pair),
        Err(AuthError::IdentityNotFound(_)) => {
            warn!("login rejected for unknown user");
            Err(AppError::InvalidCredentials)
        }
        Err(e) => Err(e.into()),
    }
}

/// Rotate a refresh token taken from the `Authorization` header or, failing
/// that, the request body.
pub async fn refresh(auth: &AuthCenter, bearer: Option<&str>, body_token: Option<&str>) -> AppResult<TokenPair> {
    let token = bearer
        .or(body_token)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated(ErrorCode::TokenMissing))?;

    let pair = auth.rotate(token).await?;
    info!("token pair refreshed");
    Ok(pair)
}

/// Revoke the bearer access token and, optionally, a refresh token.
pub async fn logout(auth: &AuthCenter, bearer: Option<&str>, refresh_token: Option<&str>) -> AppResult<()> {
    let access = bearer.ok_or(AppError::Unauthenticated(ErrorCode::TokenMissing))?;
    auth.terminate(access, refresh_token).await?;
    Ok(())
}
