//! Refresh-token rotation.
//!
//! Each refresh token can be exchanged exactly once. The old token's `jti` is
//! claimed in the [`TokenStore`] before anything is issued, so concurrent
//! presentations of the same token produce one new pair and
//! [`AuthError::TokenReplayed`] for everyone else.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::directory::UserDirectory;
use super::jwt::JwtManager;
use super::store::TokenStore;
use super::{AuthError, TokenRejection};
use crate::models::auth::{TokenPair, TokenType};

#[derive(Clone)]
pub struct RefreshService {
    jwt: JwtManager,
    store: Arc<dyn TokenStore>,
    directory: Arc<dyn UserDirectory>,
}

impl RefreshService {
    pub fn new(jwt: JwtManager, store: Arc<dyn TokenStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { jwt, store, directory }
    }

    /// Exchange a refresh token for a new access/refresh pair.
    pub async fn rotate(&self, raw: &str) -> Result<TokenPair, AuthError> {
        if !self.jwt.refresh_enabled() {
            return Err(AuthError::FeatureDisabled("refresh tokens"));
        }

        let claims = self.jwt.parse_and_validate(raw)?;
        self.jwt.validate_audience(&claims)?;
        self.jwt.validate_type(&claims, TokenType::Refresh)?;

        let jti = claims
            .token_id()
            .ok_or(AuthError::TokenInvalid(TokenRejection::MissingTokenId))?;
        let user_id = claims
            .user_id()
            .ok_or(AuthError::TokenInvalid(TokenRejection::MissingSubject))?;
        // Rotation gets no clock-skew leeway.
        if claims.is_expired_at(Utc::now()) {
            return Err(AuthError::TokenInvalid(TokenRejection::Expired));
        }
        let claimed_until = self
            .jwt
            .revocation_horizon(&claims)
            .ok_or(AuthError::TokenInvalid(TokenRejection::Malformed))?;

        if !self.store.revoke_if_absent(jti, claimed_until).await? {
            warn!(user_id, jti, "refresh token reuse rejected");
            return Err(AuthError::TokenReplayed);
        }

        let identity = self
            .directory
            .load_by_user_id(user_id)
            .await?
            .ok_or_else(|| AuthError::IdentityNotFound(user_id.to_string()))?;

        let pair = self.jwt.issue_pair(&identity)?;
        info!(user_id, old_jti = jti, "refresh token rotated");
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::auth::directory::InMemoryUserDirectory;
    use crate::auth::store::InMemoryTokenStore;
    use crate::config::JwtConfig;
    use crate::models::auth::TokenClaims;

    const SECRET: &str = "rotation-secret-with-at-least-32-bytes";

    struct Fixture {
        jwt: JwtManager,
        directory: Arc<InMemoryUserDirectory>,
        service: RefreshService,
    }

    fn fixture(config: JwtConfig) -> Fixture {
        let jwt = JwtManager::new(config).unwrap();
        let directory = Arc::new(InMemoryUserDirectory::demo());
        let service = RefreshService::new(
            jwt.clone(),
            Arc::new(InMemoryTokenStore::new()),
            directory.clone(),
        );
        Fixture { jwt, directory, service }
    }

    fn enabled() -> Fixture {
        fixture(JwtConfig::new(SECRET).with_refresh(3600))
    }

    fn refresh_claims(jwt: &JwtManager, user_id: i64, exp_offset_secs: i64) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            iss: jwt.config().issuer.clone(),
            sub: user_id.to_string(),
            aud: jwt.config().audience.clone(),
            jti: Some(crate::token_id::new_token_id()),
            iat: now - 120,
            exp: now + exp_offset_secs,
            typ: TokenType::Refresh,
            username: None,
            authorities: Vec::new(),
        }
    }

    #[tokio::test]
    async fn disabled_feature_is_reported() {
        let f = fixture(JwtConfig::new(SECRET));
        let err = f.service.rotate("anything").await.unwrap_err();
        assert!(matches!(err, AuthError::FeatureDisabled(_)));
    }

    #[tokio::test]
    async fn rotation_issues_a_fresh_pair_once() {
        let f = enabled();
        let old = f.jwt.issue_refresh(1, Duration::minutes(10)).unwrap();
        let old_jti = f.jwt.parse_and_validate(&old).unwrap().jti;

        let pair = f.service.rotate(&old).await.unwrap();
        let new_refresh = pair.refresh_token.expect("refresh token");
        let new_claims = f.jwt.parse_and_validate(&new_refresh).unwrap();
        f.jwt.validate_audience(&new_claims).unwrap();
        f.jwt.validate_type(&new_claims, TokenType::Refresh).unwrap();
        assert_ne!(new_claims.jti, old_jti);

        let access = f.jwt.parse_and_validate(&pair.access_token).unwrap();
        assert_eq!(access.username.as_deref(), Some("admin"));

        let err = f.service.rotate(&old).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenReplayed));

        // The new token is independent of the consumed one.
        f.service.rotate(&new_refresh).await.unwrap();
    }

    #[tokio::test]
    async fn access_token_cannot_be_rotated() {
        let f = enabled();
        let access = f.jwt.issue_access(1, "admin", &[], Duration::minutes(10)).unwrap();
        let err = f.service.rotate(&access).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(TokenRejection::WrongType)));
    }

    #[tokio::test]
    async fn blank_and_garbage_input_are_invalid() {
        let f = enabled();
        assert!(matches!(
            f.service.rotate(" ").await.unwrap_err(),
            AuthError::TokenInvalid(TokenRejection::Blank)
        ));
        assert!(matches!(
            f.service.rotate("a.b.c").await.unwrap_err(),
            AuthError::TokenInvalid(_)
        ));
    }

    #[tokio::test]
    async fn expiry_within_leeway_is_still_rejected() {
        let f = enabled();
        let token = f.jwt.encode_claims(&refresh_claims(&f.jwt, 1, -5)).unwrap();
        // The codec accepts it thanks to the leeway; rotation does not.
        f.jwt.parse_and_validate(&token).unwrap();
        let err = f.service.rotate(&token).await.unwrap_err();
        assert!(err.is_expired());
    }

    #[tokio::test]
    async fn missing_token_id_is_invalid() {
        let f = enabled();
        let mut claims = refresh_claims(&f.jwt, 1, 600);
        claims.jti = None;
        let token = f.jwt.encode_claims(&claims).unwrap();
        let err = f.service.rotate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(TokenRejection::MissingTokenId)));
    }

    #[tokio::test]
    async fn unknown_user_consumes_the_token() {
        let f = enabled();
        let token = f.jwt.issue_refresh(404, Duration::minutes(10)).unwrap();
        let err = f.service.rotate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::IdentityNotFound(_)));
        let err = f.service.rotate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenReplayed));
    }

    #[tokio::test]
    async fn rotation_snapshots_current_authorities() {
        let f = enabled();
        let token = f.jwt.issue_refresh(2, Duration::minutes(10)).unwrap();
        f.directory.set_authorities(2, ["api:query", "api:export"]);

        let pair = f.service.rotate(&token).await.unwrap();
        let access = f.jwt.parse_and_validate(&pair.access_token).unwrap();
        assert_eq!(access.authorities, vec!["api:query", "api:export"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rotation_succeeds_exactly_once() {
        let f = enabled();
        let token = f.jwt.issue_refresh(1, Duration::minutes(10)).unwrap();

        let tasks = (0..32).map(|_| {
            let service = f.service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.rotate(&token).await })
        });
        let results: Vec<_> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, AuthError::TokenReplayed))
        );

        let new_refresh = winners[0].refresh_token.as_deref().unwrap();
        let new_claims = f.jwt.parse_and_validate(new_refresh).unwrap();
        let old_claims = f.jwt.parse_and_validate(&token).unwrap();
        assert_ne!(new_claims.jti, old_claims.jti);
    }
}
