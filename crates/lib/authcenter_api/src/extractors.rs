//! Custom extractors for API handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use authcenter_core::auth::jwt::JwtManager;
use authcenter_core::auth::pipeline::AuthFailure;
use authcenter_core::models::auth::AuthenticatedUser;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// The identity attached by [`authenticate`](crate::middleware::auth::authenticate).
///
/// Rejects with the pipeline's failure code (`TOKEN_MISSING` when no
/// credential was presented).
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(CurrentUser(user.clone()));
        }
        let failure = parts
            .extensions
            .get::<AuthFailure>()
            .copied()
            .unwrap_or(AuthFailure::CredentialMissing);
        Err(failure.into())
    }
}

/// Required JSON body. Malformed input is rejected as a `VALIDATION_ERROR`
/// instead of axum's plain-text rejection.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(format!("Invalid JSON: {}", e.body_text())))?;
        Ok(ValidatedJson(value))
    }
}

/// JSON body that may be absent. An empty body yields `None`.
pub struct OptionalJson<T>(pub Option<T>);

impl<S, T> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(format!("Unreadable body: {e}")))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }
        serde_json::from_slice(&bytes)
            .map(|value| OptionalJson(Some(value)))
            .map_err(|e| AppError::Validation(format!("Invalid JSON: {e}")))
    }
}

/// Raw bearer token from the `Authorization` header, if any.
pub struct BearerToken(pub Option<String>);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        Ok(BearerToken(JwtManager::extract_bearer(header).map(str::to_owned)))
    }
}
