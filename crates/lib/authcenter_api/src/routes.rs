//! Route paths.

pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";

pub const GET_API_HELLO: &str = "/api/hello";
pub const GET_API_ME: &str = "/api/me";
pub const GET_API_QUERY: &str = "/api/query";
pub const POST_API_ADD: &str = "/api/add";
pub const POST_API_ADMIN_TASK: &str = "/api/admin/task";
pub const GET_API_ORDERS_ID: &str = "/api/orders/{id}";
