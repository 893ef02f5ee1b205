//! JWT issuance and verification.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::{AuthError, TokenRejection};
use crate::config::JwtConfig;
use crate::models::auth::{Identity, TokenClaims, TokenPair, TokenType};
use crate::token_id::new_token_id;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// `token_type` reported in every [`TokenPair`].
pub const BEARER: &str = "Bearer";

/// Signs and verifies access and refresh tokens with the shared HS256 secret.
#[derive(Clone)]
pub struct JwtManager {
    config: Arc<JwtConfig>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtManager {
    /// Builds a manager, rejecting weak or incomplete configuration.
    pub fn new(config: JwtConfig) -> Result<Self, AuthError> {
        config.validate()?;

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = config.clock_skew_secs;
        // Audience is checked separately so callers can decide when it applies.
        validation.validate_aud = false;

        Ok(Self {
            config: Arc::new(config),
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
        })
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn refresh_enabled(&self) -> bool {
        self.config.refresh_enabled
    }

    // ------------------------------------------------------------------
    // Issuance
    // ------------------------------------------------------------------

    /// Issue an access token carrying the username and an authorities snapshot.
    pub fn issue_access(
        &self,
        user_id: i64,
        username: &str,
        authorities: &[String],
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let claims = self.claims(user_id, TokenType::Access, ttl)?;
        self.encode_claims(&TokenClaims {
            username: Some(username.to_string()),
            authorities: authorities.to_vec(),
            ..claims
        })
    }

    /// Issue a refresh token. Carries no business claims.
    pub fn issue_refresh(&self, user_id: i64, ttl: Duration) -> Result<String, AuthError> {
        if !self.config.refresh_enabled {
            return Err(AuthError::FeatureDisabled("refresh tokens"));
        }
        let claims = self.claims(user_id, TokenType::Refresh, ttl)?;
        self.encode_claims(&claims)
    }

    /// Issue an access token, plus a refresh token when refresh is enabled,
    /// using the configured lifetimes.
    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let access_token = self.issue_access(
            identity.user_id,
            &identity.username,
            &identity.authorities,
            self.config.access_ttl(),
        )?;
        let refresh_token = if self.config.refresh_enabled {
            Some(self.issue_refresh(identity.user_id, self.config.refresh_ttl())?)
        } else {
            None
        };
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: BEARER.to_string(),
            expires_in: self.config.access_ttl_secs,
        })
    }

    fn claims(&self, user_id: i64, typ: TokenType, ttl: Duration) -> Result<TokenClaims, AuthError> {
        if ttl <= Duration::zero() {
            return Err(AuthError::Config(format!("{typ} token TTL must be > 0")));
        }
        let now = Utc::now();
        Ok(TokenClaims {
            iss: self.config.issuer.clone(),
            sub: user_id.to_string(),
            aud: self
                .config
                .audience
                .iter()
                .filter(|aud| !aud.trim().is_empty())
                .cloned()
                .collect(),
            jti: Some(new_token_id()),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            typ,
            username: None,
            authorities: Vec::new(),
        })
    }

    pub(crate) fn encode_claims(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Verify signature, issuer and expiry (within the clock-skew leeway).
    ///
    /// Signature is checked before expiry, so an `Expired` rejection always
    /// refers to an authentic token.
    pub fn parse_and_validate(&self, raw: &str) -> Result<TokenClaims, AuthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::TokenInvalid(TokenRejection::Blank));
        }
        decode::<TokenClaims>(raw, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let rejection = rejection_for(e.kind());
                debug!(reason = %rejection, "token rejected");
                AuthError::TokenInvalid(rejection)
            })
    }

    /// Require the token's audience to intersect the configured audiences.
    pub fn validate_audience(&self, claims: &TokenClaims) -> Result<(), AuthError> {
        let accepted = claims
            .aud
            .iter()
            .any(|aud| self.config.audience.iter().any(|allowed| allowed == aud));
        if accepted {
            Ok(())
        } else {
            Err(AuthError::TokenInvalid(TokenRejection::Audience))
        }
    }

    /// Require the `typ` claim to match the context.
    pub fn validate_type(&self, claims: &TokenClaims, expected: TokenType) -> Result<(), AuthError> {
        if claims.typ == expected {
            Ok(())
        } else {
            Err(AuthError::TokenInvalid(TokenRejection::WrongType))
        }
    }

    /// Last instant at which [`parse_and_validate`](Self::parse_and_validate)
    /// still accepts the token: `exp` plus the clock-skew leeway. Revocations
    /// must outlive this, not just `exp`.
    pub fn revocation_horizon(&self, claims: &TokenClaims) -> Option<DateTime<Utc>> {
        let skew = i64::try_from(self.config.clock_skew_secs).ok()?;
        claims.expires_at()?.checked_add_signed(Duration::seconds(skew))
    }

    /// Extract the token from an `Authorization: Bearer <token>` header value.
    pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
        let token = header?.trim_start().strip_prefix("Bearer ")?.trim();
        (!token.is_empty()).then_some(token)
    }
}

fn rejection_for(kind: &ErrorKind) -> TokenRejection {
    match kind {
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenRejection::Signature,
        ErrorKind::InvalidIssuer => TokenRejection::Issuer,
        ErrorKind::InvalidAudience => TokenRejection::Audience,
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "sub" => TokenRejection::MissingSubject,
            "iss" => TokenRejection::Issuer,
            _ => TokenRejection::Malformed,
        },
        _ => TokenRejection::Malformed,
    }
}
