//! # authcenter_api
//!
//! HTTP API library for Auth Center: login, refresh and logout endpoints, the
//! authentication middleware, permission layers and JSON error bodies.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use authcenter_core::auth::directory::UserDirectory;
use authcenter_core::auth::permission::Requirement;
use authcenter_core::{AuthCenter, AuthError};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{api, auth};
use crate::middleware::RequirePermission;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token issuance, validation, revocation and permission checks.
    pub auth: AuthCenter,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Builds the auth components from `config.jwt` with an in-memory token
    /// store.
    pub fn new(config: ApiConfig, directory: Arc<dyn UserDirectory>) -> Result<Self, AuthError> {
        let auth = AuthCenter::builder()
            .config(config.jwt.clone())
            .directory(directory)
            .build()?;
        Ok(Self { auth, config })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let require = |requirement: Requirement| {
        RequirePermission::new(state.auth.evaluator().clone(), requirement)
    };

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_API_HELLO, get(api::hello))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::GET_API_ME, get(api::me))
        .route(
            routes::GET_API_QUERY,
            get(api::query).route_layer(require(Requirement::any().permission("api:query"))),
        )
        .route(
            routes::POST_API_ADD,
            post(api::add).route_layer(require(
                Requirement::all().permission("api:add").role("ROLE_ADMIN"),
            )),
        )
        .route(
            routes::POST_API_ADMIN_TASK,
            post(api::admin_task).route_layer(require(Requirement::all().role("ROLE_ADMIN"))),
        )
        .route(routes::GET_API_ORDERS_ID, get(api::get_order))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .layer(axum::middleware::from_fn(middleware::errors::attach_error_path))
        .layer(cors)
        .with_state(state)
}
