//! Assembled auth components.

use std::sync::Arc;

use tracing::info;

use super::AuthError;
use super::directory::UserDirectory;
use super::jwt::JwtManager;
use super::logout::LogoutService;
use super::permission::{PermissionChecker, PermissionEvaluator, Requirement};
use super::pipeline::{AuthOutcome, Authenticator};
use super::refresh::RefreshService;
use super::store::{InMemoryTokenStore, TokenStore};
use crate::config::JwtConfig;
use crate::models::auth::{AuthenticatedUser, TokenPair};

/// Every auth component wired to one codec, one token store and one
/// directory. Cheap to clone.
#[derive(Clone)]
pub struct AuthCenter {
    jwt: JwtManager,
    store: Arc<dyn TokenStore>,
    directory: Arc<dyn UserDirectory>,
    authenticator: Authenticator,
    refresh: RefreshService,
    logout: LogoutService,
    evaluator: PermissionEvaluator,
}

impl AuthCenter {
    pub fn builder() -> AuthCenterBuilder {
        AuthCenterBuilder::default()
    }

    pub fn config(&self) -> &JwtConfig {
        self.jwt.config()
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn refresh_service(&self) -> &RefreshService {
        &self.refresh
    }

    pub fn logout_service(&self) -> &LogoutService {
        &self.logout
    }

    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    /// Issue a token pair for a known user. No password check happens here;
    /// the host is responsible for verifying credentials first.
    pub async fn login(&self, username: &str) -> Result<TokenPair, AuthError> {
        let username = username.trim();
        let identity = if username.is_empty() {
            None
        } else {
            self.directory.load_by_username(username).await?
        };
        let identity = identity.ok_or_else(|| AuthError::IdentityNotFound(username.to_string()))?;

        let pair = self.jwt.issue_pair(&identity)?;
        info!(user_id = identity.user_id, username = %identity.username, "login");
        Ok(pair)
    }

    pub async fn authenticate(&self, authorization: Option<&str>) -> AuthOutcome {
        self.authenticator.authenticate(authorization).await
    }

    pub async fn rotate(&self, refresh_raw: &str) -> Result<TokenPair, AuthError> {
        self.refresh.rotate(refresh_raw).await
    }

    pub async fn terminate(&self, access_raw: &str, refresh_raw: Option<&str>) -> Result<(), AuthError> {
        self.logout.terminate(access_raw, refresh_raw).await
    }

    pub fn check(&self, user: Option<&AuthenticatedUser>, requirement: &Requirement) -> Result<(), AuthError> {
        self.evaluator.check(user, requirement)
    }
}

/// Builder for [`AuthCenter`]. A config and a directory are required; the
/// store defaults to [`InMemoryTokenStore`].
#[derive(Default)]
pub struct AuthCenterBuilder {
    config: Option<JwtConfig>,
    store: Option<Arc<dyn TokenStore>>,
    directory: Option<Arc<dyn UserDirectory>>,
    checker: Option<Arc<dyn PermissionChecker>>,
}

impl AuthCenterBuilder {
    pub fn config(mut self, config: JwtConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn permission_checker(mut self, checker: Arc<dyn PermissionChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn build(self) -> Result<AuthCenter, AuthError> {
        let config = self
            .config
            .ok_or_else(|| AuthError::Config("JWT configuration is required".into()))?;
        let directory = self
            .directory
            .ok_or_else(|| AuthError::Config("a user directory is required".into()))?;
        let store: Arc<dyn TokenStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryTokenStore::new()),
        };
        let evaluator = self
            .checker
            .map(PermissionEvaluator::new)
            .unwrap_or_default();

        let jwt = JwtManager::new(config)?;
        Ok(AuthCenter {
            authenticator: Authenticator::new(jwt.clone(), store.clone(), directory.clone()),
            refresh: RefreshService::new(jwt.clone(), store.clone(), directory.clone()),
            logout: LogoutService::new(jwt.clone(), store.clone()),
            jwt,
            store,
            directory,
            evaluator,
        })
    }
}
