//! Request middleware.

pub mod auth;
pub mod errors;
pub mod permission;

pub use permission::RequirePermission;
