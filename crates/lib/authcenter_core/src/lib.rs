//! # authcenter_core
//!
//! Core token lifecycle, revocation and permission logic for Auth Center.
//!
//! Everything here is framework independent: the HTTP boundary lives in
//! `authcenter_api`, and the user directory is supplied by the host through
//! [`auth::directory::UserDirectory`].

pub mod auth;
pub mod config;
pub mod models;
pub mod token_id;

pub use auth::center::{AuthCenter, AuthCenterBuilder};
pub use auth::{AuthError, ErrorCode, TokenRejection};
pub use config::JwtConfig;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
