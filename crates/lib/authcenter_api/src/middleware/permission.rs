//! Route-level permission enforcement.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use authcenter_core::auth::permission::{PermissionEvaluator, Requirement};
use authcenter_core::auth::pipeline::AuthFailure;
use authcenter_core::models::auth::AuthenticatedUser;
use tower::{Layer, Service};

use crate::error::AppError;

// =============================================================================
// RequirePermission
// =============================================================================

/// Layer that admits a request only if its identity satisfies a
/// [`Requirement`].
///
/// Requests without an identity get 401 with the recorded failure code;
/// identities that fall short get 403.
#[derive(Clone)]
pub struct RequirePermission {
    evaluator: PermissionEvaluator,
    requirement: Arc<Requirement>,
}

impl RequirePermission {
    pub fn new(evaluator: PermissionEvaluator, requirement: Requirement) -> Self {
        Self {
            evaluator,
            requirement: Arc::new(requirement),
        }
    }
}

impl<S> Layer<S> for RequirePermission {
    type Service = RequirePermissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionService {
            inner,
            evaluator: self.evaluator.clone(),
            requirement: self.requirement.clone(),
        }
    }
}

// =============================================================================
// RequirePermissionService
// =============================================================================

#[derive(Clone)]
pub struct RequirePermissionService<S> {
    inner: S,
    evaluator: PermissionEvaluator,
    requirement: Arc<Requirement>,
}

impl<S> Service<Request<Body>> for RequirePermissionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>();
        let verdict = match user {
            None => {
                let failure = req
                    .extensions()
                    .get::<AuthFailure>()
                    .copied()
                    .unwrap_or(AuthFailure::CredentialMissing);
                Err(AppError::from(failure))
            }
            Some(user) => self
                .evaluator
                .check(Some(user), &self.requirement)
                .map_err(AppError::from),
        };

        if let Err(err) = verdict {
            return Box::pin(async move { Ok(err.into_response()) });
        }

        // Use the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use authcenter_core::models::auth::Identity;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;

    async fn ok(_req: Request<Body>) -> Result<Response, Infallible> {
        Ok(Response::new(Body::empty()))
    }

    fn request_as(authorities: &[&str]) -> Request<Body> {
        let mut req = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let identity = Identity::new(1, "admin", authorities.iter().copied());
        req.extensions_mut()
            .insert(AuthenticatedUser::from_identity(1, identity, "jti"));
        req
    }

    fn layer(requirement: Requirement) -> RequirePermission {
        RequirePermission::new(PermissionEvaluator::default(), requirement)
    }

    #[tokio::test]
    async fn permitted_request_reaches_inner_service() {
        let service = layer(Requirement::any().permission("api:query")).layer(tower::service_fn(ok));
        let response = service.oneshot(request_as(&["api:query"])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn insufficient_authorities_are_forbidden() {
        let service =
            layer(Requirement::all().permission("api:add").role("ROLE_ADMIN")).layer(tower::service_fn(ok));
        let response = service.oneshot(request_as(&["api:add"])).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized_with_recorded_code() {
        let service = layer(Requirement::all()).layer(tower::service_fn(ok));
        let mut req = Request::builder().uri("/test").body(Body::empty()).unwrap();
        req.extensions_mut().insert(AuthFailure::CredentialRevoked);

        let response = service.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "TOKEN_BLACKLISTED");
        assert_eq!(json["code"], 40104);
    }
}
