//! Service layer between handlers and `authcenter_core`.

pub mod auth;
