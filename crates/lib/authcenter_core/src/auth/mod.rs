//! Authentication and authorization logic.
//!
//! Token issuance and validation, the revocation registry, refresh-token
//! rotation, logout, the per-request authentication pipeline and permission
//! checks. Shared by `authcenter_api` and any other host that embeds the core.

pub mod center;
pub mod directory;
pub mod jwt;
pub mod logout;
pub mod permission;
pub mod pipeline;
pub mod refresh;
pub mod store;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Reason a token failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRejection {
    /// No token text at all.
    Blank,
    /// Not a decodable JWT, or claims of the wrong shape.
    Malformed,
    /// Signature or algorithm mismatch.
    Signature,
    /// `iss` does not match the configured issuer.
    Issuer,
    /// `exp` has passed (beyond the clock-skew leeway where one applies).
    Expired,
    /// `aud` does not intersect the allowed audiences.
    Audience,
    /// `typ` is not the type this context requires.
    WrongType,
    /// `jti` missing or blank.
    MissingTokenId,
    /// `sub` missing, blank, or not an integer user id.
    MissingSubject,
}

impl TokenRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenRejection::Blank => "token is blank",
            TokenRejection::Malformed => "malformed token",
            TokenRejection::Signature => "invalid signature",
            TokenRejection::Issuer => "invalid issuer",
            TokenRejection::Expired => "token expired",
            TokenRejection::Audience => "invalid audience",
            TokenRejection::WrongType => "unexpected token type",
            TokenRejection::MissingTokenId => "missing jti",
            TokenRejection::MissingSubject => "missing or invalid sub",
        }
    }
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Misconfiguration; fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feature disabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Invalid token: {0}")]
    TokenInvalid(TokenRejection),

    /// Refresh token already rotated, logged out or otherwise revoked.
    /// The message is the same for every cause.
    #[error("Token is no longer valid")]
    TokenReplayed,

    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    #[error("Insufficient permission")]
    PermissionDenied,

    #[error("Token store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// `true` when the token was authentic but past its expiry.
    pub fn is_expired(&self) -> bool {
        matches!(self, AuthError::TokenInvalid(TokenRejection::Expired))
    }
}

/// Stable machine-readable error codes for the response layer.
///
/// The string form (`TOKEN_EXPIRED`) and numeric form (`40102`) are both part
/// of the public contract; human-readable messages are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TokenMissing,
    TokenExpired,
    TokenInvalid,
    TokenBlacklisted,
    Forbidden,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TokenMissing => "TOKEN_MISSING",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TokenInvalid => "TOKEN_INVALID",
            ErrorCode::TokenBlacklisted => "TOKEN_BLACKLISTED",
            ErrorCode::Forbidden => "FORBIDDEN",
        }
    }

    /// Numeric code: `401xx` for authentication, `403xx` for authorization.
    pub fn numeric(&self) -> u32 {
        match self {
            ErrorCode::TokenMissing => 40101,
            ErrorCode::TokenExpired => 40102,
            ErrorCode::TokenInvalid => 40103,
            ErrorCode::TokenBlacklisted => 40104,
            ErrorCode::Forbidden => 40301,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::TokenMissing => "Authentication required",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Token is invalid",
            ErrorCode::TokenBlacklisted => "Token has been revoked",
            ErrorCode::Forbidden => "Insufficient permission",
        }
    }

    pub fn is_authentication(&self) -> bool {
        !matches!(self, ErrorCode::Forbidden)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
