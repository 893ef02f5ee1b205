//! Per-request authentication.
//!
//! Turns an `Authorization` header into an [`AuthenticatedUser`] or a
//! classified [`AuthFailure`]. Rendering the failure is left to the caller.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::directory::UserDirectory;
use super::jwt::JwtManager;
use super::store::TokenStore;
use super::{AuthError, ErrorCode};
use crate::models::auth::{AuthenticatedUser, TokenType};

/// Why a request could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFailure {
    /// No bearer credential was presented.
    CredentialMissing,
    CredentialExpired,
    /// Anything else wrong with the token or the user behind it.
    CredentialInvalid,
    /// Token was logged out or rotated.
    CredentialRevoked,
}

impl AuthFailure {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthFailure::CredentialMissing => ErrorCode::TokenMissing,
            AuthFailure::CredentialExpired => ErrorCode::TokenExpired,
            AuthFailure::CredentialInvalid => ErrorCode::TokenInvalid,
            AuthFailure::CredentialRevoked => ErrorCode::TokenBlacklisted,
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code().as_str())
    }
}

impl From<AuthError> for AuthFailure {
    fn from(err: AuthError) -> Self {
        if err.is_expired() {
            AuthFailure::CredentialExpired
        } else {
            AuthFailure::CredentialInvalid
        }
    }
}

/// Result of running the pipeline on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(AuthenticatedUser),
    Unauthenticated(AuthFailure),
}

impl AuthOutcome {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            AuthOutcome::Authenticated(user) => Some(user),
            AuthOutcome::Unauthenticated(_) => None,
        }
    }

    pub fn failure(&self) -> Option<AuthFailure> {
        match self {
            AuthOutcome::Authenticated(_) => None,
            AuthOutcome::Unauthenticated(failure) => Some(*failure),
        }
    }

    pub fn into_result(self) -> Result<AuthenticatedUser, AuthFailure> {
        match self {
            AuthOutcome::Authenticated(user) => Ok(user),
            AuthOutcome::Unauthenticated(failure) => Err(failure),
        }
    }
}

#[derive(Clone)]
pub struct Authenticator {
    jwt: JwtManager,
    store: Arc<dyn TokenStore>,
    directory: Arc<dyn UserDirectory>,
}

impl Authenticator {
    pub fn new(jwt: JwtManager, store: Arc<dyn TokenStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { jwt, store, directory }
    }

    /// Authenticate from a raw `Authorization` header value.
    ///
    /// A missing credential is reported as [`AuthFailure::CredentialMissing`];
    /// whether that rejects the request is the caller's decision.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AuthOutcome {
        let Some(token) = JwtManager::extract_bearer(authorization) else {
            return AuthOutcome::Unauthenticated(AuthFailure::CredentialMissing);
        };
        match self.verify(token).await {
            Ok(user) => {
                debug!(user_id = user.user_id, jti = %user.token_id, "request authenticated");
                AuthOutcome::Authenticated(user)
            }
            Err(failure) => {
                debug!(code = %failure.code(), "request not authenticated");
                AuthOutcome::Unauthenticated(failure)
            }
        }
    }

    /// Like [`authenticate`](Self::authenticate), but reuses an identity that
    /// is already attached to the request.
    pub async fn authenticate_once(
        &self,
        existing: Option<&AuthenticatedUser>,
        authorization: Option<&str>,
    ) -> AuthOutcome {
        match existing {
            Some(user) => AuthOutcome::Authenticated(user.clone()),
            None => self.authenticate(authorization).await,
        }
    }

    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthFailure> {
        let claims = self.jwt.parse_and_validate(token)?;
        self.jwt.validate_audience(&claims)?;
        self.jwt.validate_type(&claims, TokenType::Access)?;

        let jti = claims.token_id().ok_or(AuthFailure::CredentialInvalid)?;
        if self.store.is_revoked(jti).await? {
            return Err(AuthFailure::CredentialRevoked);
        }

        let user_id = claims.user_id().ok_or(AuthFailure::CredentialInvalid)?;
        let identity = self
            .directory
            .load_by_user_id(user_id)
            .await?
            .ok_or(AuthFailure::CredentialInvalid)?;

        Ok(AuthenticatedUser::from_identity(user_id, identity, jti))
    }
}
