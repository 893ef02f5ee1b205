//! Demo API handlers.
//!
//! Route-level permissions are applied in [`router`](crate::router) with
//! [`RequirePermission`](crate::middleware::RequirePermission); the order
//! endpoint checks inside the handler instead.

use axum::Json;
use axum::extract::{Path, State};
use authcenter_core::auth::permission::Requirement;

use crate::AppState;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::models::{MeResponse, OrderResponse, StatusResponse};

/// Permission required to read an order.
pub const ORDER_READ: &str = "perm:order:read";

/// `GET /api/hello`: public connectivity check.
pub async fn hello() -> &'static str {
    "hello"
}

/// `GET /api/me`: the authenticated principal.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        authorities: user.sorted_authorities(),
        username: user.username,
    })
}

/// `GET /api/query`: requires `api:query`.
pub async fn query() -> Json<StatusResponse> {
    Json(StatusResponse::ok("query allowed"))
}

/// `POST /api/add`: requires `api:add` and `ROLE_ADMIN`.
pub async fn add() -> Json<StatusResponse> {
    Json(StatusResponse::ok("add allowed"))
}

/// `POST /api/admin/task`: requires `ROLE_ADMIN`.
pub async fn admin_task() -> Json<StatusResponse> {
    Json(StatusResponse::ok("admin task created"))
}

/// `GET /api/orders/{id}`: requires [`ORDER_READ`].
pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderResponse>> {
    state
        .auth
        .check(Some(&user), &Requirement::all().permission(ORDER_READ))?;
    Ok(Json(OrderResponse {
        order_id: id,
        owner: user.username,
    }))
}
