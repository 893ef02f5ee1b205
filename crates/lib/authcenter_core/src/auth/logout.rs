//! Logout: revoke the presented tokens until the codec would reject them anyway.

use std::sync::Arc;

use tracing::{debug, info};

use super::jwt::JwtManager;
use super::store::TokenStore;
use super::{AuthError, TokenRejection};
use crate::models::auth::TokenType;

#[derive(Clone)]
pub struct LogoutService {
    jwt: JwtManager,
    store: Arc<dyn TokenStore>,
}

impl LogoutService {
    pub fn new(jwt: JwtManager, store: Arc<dyn TokenStore>) -> Self {
        Self { jwt, store }
    }

    /// Revoke an access token and, if given, its refresh token.
    ///
    /// The refresh token is ignored when refresh is disabled. Tokens expired
    /// beyond the clock-skew leeway are accepted and left alone.
    pub async fn terminate(&self, access_raw: &str, refresh_raw: Option<&str>) -> Result<(), AuthError> {
        if access_raw.trim().is_empty() {
            return Err(AuthError::TokenInvalid(TokenRejection::Blank));
        }
        self.revoke(access_raw, TokenType::Access).await?;

        let Some(refresh_raw) = refresh_raw.filter(|raw| !raw.trim().is_empty()) else {
            return Ok(());
        };
        if !self.jwt.refresh_enabled() {
            debug!("refresh disabled, ignoring refresh token on logout");
            return Ok(());
        }
        self.revoke(refresh_raw, TokenType::Refresh).await
    }

    /// Revoke an access token only.
    pub async fn terminate_access(&self, access_raw: &str) -> Result<(), AuthError> {
        self.terminate(access_raw, None).await
    }

    async fn revoke(&self, raw: &str, typ: TokenType) -> Result<(), AuthError> {
        let claims = match self.jwt.parse_and_validate(raw) {
            Ok(claims) => claims,
            // Authentic but expired: nothing left to revoke.
            Err(e) if e.is_expired() => return Ok(()),
            Err(e) => return Err(e),
        };
        self.jwt.validate_type(&claims, typ)?;

        let jti = claims
            .token_id()
            .ok_or(AuthError::TokenInvalid(TokenRejection::MissingTokenId))?;
        // Held until the codec stops accepting the token, leeway included.
        let revoked_until = self
            .jwt
            .revocation_horizon(&claims)
            .ok_or(AuthError::TokenInvalid(TokenRejection::Malformed))?;

        self.store.revoke(jti, revoked_until).await?;
        info!(user_id = claims.user_id(), jti, typ = %typ, %revoked_until, "token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::auth::directory::InMemoryUserDirectory;
    use crate::auth::refresh::RefreshService;
    use crate::auth::store::InMemoryTokenStore;
    use crate::config::JwtConfig;

    const SECRET: &str = "logout-secret-with-at-least-32-bytes!!";

    fn setup(config: JwtConfig) -> (JwtManager, Arc<InMemoryTokenStore>, LogoutService) {
        let jwt = JwtManager::new(config).unwrap();
        let store = Arc::new(InMemoryTokenStore::new());
        let logout = LogoutService::new(jwt.clone(), store.clone());
        (jwt, store, logout)
    }

    fn jti_of(jwt: &JwtManager, token: &str) -> String {
        jwt.parse_and_validate(token).unwrap().jti.unwrap()
    }

    #[tokio::test]
    async fn access_token_is_revoked() {
        let (jwt, store, logout) = setup(JwtConfig::new(SECRET));
        let access = jwt.issue_access(1, "admin", &[], Duration::minutes(5)).unwrap();

        logout.terminate_access(&access).await.unwrap();
        assert!(store.is_revoked(&jti_of(&jwt, &access)).await.unwrap());

        // Logging out twice is harmless.
        logout.terminate_access(&access).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn refresh_token_is_revoked_and_cannot_rotate() {
        let (jwt, store, logout) = setup(JwtConfig::new(SECRET).with_refresh(3600));
        let refresh_service = RefreshService::new(
            jwt.clone(),
            store.clone(),
            Arc::new(InMemoryUserDirectory::demo()),
        );
        let access = jwt.issue_access(1, "admin", &[], Duration::minutes(5)).unwrap();
        let refresh = jwt.issue_refresh(1, Duration::minutes(30)).unwrap();

        logout.terminate(&access, Some(&refresh)).await.unwrap();
        assert!(store.is_revoked(&jti_of(&jwt, &refresh)).await.unwrap());

        let err = refresh_service.rotate(&refresh).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenReplayed));
    }

    #[tokio::test]
    async fn refresh_token_ignored_when_disabled() {
        let (jwt, store, logout) = setup(JwtConfig::new(SECRET));
        let access = jwt.issue_access(1, "admin", &[], Duration::minutes(5)).unwrap();

        logout.terminate(&access, Some("not-even-a-jwt")).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn invalid_refresh_token_is_reported_when_enabled() {
        let (jwt, _store, logout) = setup(JwtConfig::new(SECRET).with_refresh(3600));
        let access = jwt.issue_access(1, "admin", &[], Duration::minutes(5)).unwrap();
        let err = logout.terminate(&access, Some("garbage")).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(_)));
    }

    #[tokio::test]
    async fn blank_access_token_is_invalid() {
        let (_jwt, _store, logout) = setup(JwtConfig::new(SECRET));
        let err = logout.terminate("  ", None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(TokenRejection::Blank)));
    }

    #[tokio::test]
    async fn expired_access_token_is_a_no_op() {
        let (jwt, store, logout) = setup(JwtConfig::new(SECRET).with_clock_skew_secs(0));
        let mut claims = jwt.parse_and_validate(
            &jwt.issue_access(1, "admin", &[], Duration::minutes(5)).unwrap(),
        )
        .unwrap();
        claims.exp = Utc::now().timestamp() - 10;
        let expired = jwt.encode_claims(&claims).unwrap();

        logout.terminate_access(&expired).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn token_inside_leeway_is_revoked_past_exp() {
        let (jwt, store, logout) = setup(JwtConfig::new(SECRET).with_clock_skew_secs(30));
        let mut claims = jwt.parse_and_validate(
            &jwt.issue_access(1, "admin", &[], Duration::minutes(5)).unwrap(),
        )
        .unwrap();
        claims.exp = Utc::now().timestamp() - 5;
        let lapsed = jwt.encode_claims(&claims).unwrap();

        // Still accepted by the codec, so logout must take effect.
        assert!(jwt.parse_and_validate(&lapsed).is_ok());
        logout.terminate_access(&lapsed).await.unwrap();
        assert!(store.is_revoked(claims.jti.as_deref().unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn refresh_token_cannot_stand_in_for_access() {
        let (jwt, _store, logout) = setup(JwtConfig::new(SECRET).with_refresh(3600));
        let refresh = jwt.issue_refresh(1, Duration::minutes(30)).unwrap();
        let err = logout.terminate_access(&refresh).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(TokenRejection::WrongType)));
    }
}
