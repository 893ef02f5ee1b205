//! Authentication middleware: bearer extraction, token verification and
//! attaching the result to request extensions.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use authcenter_core::auth::pipeline::{AuthFailure, AuthOutcome};
use authcenter_core::models::auth::AuthenticatedUser;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Runs the authentication pipeline on every request.
///
/// On success inserts [`AuthenticatedUser`]; otherwise inserts the
/// [`AuthFailure`] and lets the request continue, so public routes still work.
/// Requests that already carry an identity are left alone.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = request.extensions().get::<AuthenticatedUser>().cloned();
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let outcome = state
        .auth
        .authenticator()
        .authenticate_once(existing.as_ref(), header.as_deref())
        .await;

    match outcome {
        AuthOutcome::Authenticated(user) => {
            request.extensions_mut().insert(user);
        }
        AuthOutcome::Unauthenticated(failure) => {
            request.extensions_mut().insert(failure);
        }
    }
    next.run(request).await
}

/// Rejects requests without an authenticated identity, using the failure
/// code recorded by [`authenticate`].
pub async fn require_auth(request: Request, next: Next) -> Result<Response, AppError> {
    if request.extensions().get::<AuthenticatedUser>().is_some() {
        return Ok(next.run(request).await);
    }
    let failure = request
        .extensions()
        .get::<AuthFailure>()
        .copied()
        .unwrap_or(AuthFailure::CredentialMissing);
    debug!(path = %request.uri().path(), code = %failure.code(), "unauthenticated request rejected");
    Err(failure.into())
}
