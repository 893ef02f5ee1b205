//! Application error types and the JSON error body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use authcenter_core::auth::pipeline::AuthFailure;
use authcenter_core::{AuthError, ErrorCode, TokenRejection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Body of every error response.
///
/// `code` is numeric (`40102`), `error` the matching string code
/// (`TOKEN_EXPIRED`). `path` is filled in by
/// [`attach_error_path`](crate::middleware::errors::attach_error_path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub code: u32,
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", .0.message())]
    Unauthenticated(ErrorCode),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Insufficient permission")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::FeatureDisabled(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Numeric and string codes for the response body.
    pub fn codes(&self) -> (u32, &'static str) {
        match self {
            AppError::Unauthenticated(code) => (code.numeric(), code.as_str()),
            AppError::InvalidCredentials => {
                (ErrorCode::TokenInvalid.numeric(), ErrorCode::TokenInvalid.as_str())
            }
            AppError::Forbidden => (ErrorCode::Forbidden.numeric(), ErrorCode::Forbidden.as_str()),
            AppError::Validation(_) => (40000, "VALIDATION_ERROR"),
            AppError::FeatureDisabled(_) => (40000, "FEATURE_DISABLED"),
            AppError::Internal(_) => (50000, "INTERNAL_ERROR"),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (code, error) = self.codes();
        ErrorBody {
            timestamp: Utc::now(),
            code,
            error: error.to_string(),
            message: self.to_string(),
            path: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            error!(detail = %detail, "internal error");
        }
        let body = self.body();
        let mut response = (self.status(), Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        AppError::Unauthenticated(failure.code())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Config(msg) => AppError::Internal(msg),
            AuthError::FeatureDisabled(feature) => AppError::FeatureDisabled(feature.into()),
            AuthError::TokenInvalid(TokenRejection::Expired) => {
                AppError::Unauthenticated(ErrorCode::TokenExpired)
            }
            AuthError::TokenInvalid(_) | AuthError::IdentityNotFound(_) => {
                AppError::Unauthenticated(ErrorCode::TokenInvalid)
            }
            AuthError::TokenReplayed => AppError::Unauthenticated(ErrorCode::TokenBlacklisted),
            AuthError::PermissionDenied => AppError::Forbidden,
            AuthError::Store(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
