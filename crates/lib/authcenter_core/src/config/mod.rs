//! JWT signing, validation and lifetime settings.

mod env;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

pub use env::resolve_jwt_secret;

/// Minimum HS256 secret length in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Default access token lifetime: 30 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 30 * 60;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Default clock-skew leeway applied to `exp`.
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 30;

/// JWT configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Shared HS256 signing secret. Never serialized.
    #[serde(skip_serializing)]
    pub secret: String,
    /// `iss` written at issuance and required at validation.
    pub issuer: String,
    /// Audiences written at issuance; a token is accepted if its `aud`
    /// contains any of them.
    pub audience: Vec<String>,
    pub access_ttl_secs: i64,
    /// Whether refresh tokens are issued and accepted at all.
    pub refresh_enabled: bool,
    pub refresh_ttl_secs: i64,
    /// Leeway for `exp` checks during validation.
    pub clock_skew_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "auth-center".to_string(),
            audience: vec!["demo-app".to_string()],
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_enabled: false,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_enabled", &self.refresh_enabled)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .finish()
    }
}

impl JwtConfig {
    /// Creates a configuration with the given secret and defaults elsewhere.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = audience.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_access_ttl_secs(mut self, secs: i64) -> Self {
        self.access_ttl_secs = secs;
        self
    }

    /// Enables refresh tokens with the given lifetime.
    pub fn with_refresh(mut self, ttl_secs: i64) -> Self {
        self.refresh_enabled = true;
        self.refresh_ttl_secs = ttl_secs;
        self
    }

    pub fn with_clock_skew_secs(mut self, secs: u64) -> Self {
        self.clock_skew_secs = secs;
        self
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_ttl_secs)
    }

    /// Reads configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// | Variable               | Default        |
    /// |------------------------|----------------|
    /// | `JWT_SECRET` / `AUTH_SECRET` | required |
    /// | `JWT_ISSUER`           | `auth-center`  |
    /// | `JWT_AUDIENCE`         | `demo-app` (comma separated) |
    /// | `JWT_ACCESS_TTL_SECS`  | `1800`         |
    /// | `JWT_REFRESH_ENABLED`  | `false`        |
    /// | `JWT_REFRESH_TTL_SECS` | `604800`       |
    /// | `JWT_CLOCK_SKEW_SECS`  | `30`           |
    pub fn from_env() -> Result<Self, AuthError> {
        env::from_env()
    }

    /// Rejects weak or inconsistent settings.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.secret.trim().is_empty() {
            return Err(AuthError::Config("JWT secret must not be blank".into()));
        }
        if self.secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::Config(format!(
                "JWT secret must be at least {MIN_SECRET_BYTES} bytes for HS256"
            )));
        }
        if self.issuer.trim().is_empty() {
            return Err(AuthError::Config("JWT issuer must not be blank".into()));
        }
        if !self.audience.iter().any(|aud| !aud.trim().is_empty()) {
            return Err(AuthError::Config("JWT audience must not be empty".into()));
        }
        if self.access_ttl_secs <= 0 {
            return Err(AuthError::Config("access token TTL must be > 0".into()));
        }
        if self.refresh_enabled && self.refresh_ttl_secs <= 0 {
            return Err(AuthError::Config(
                "refresh token TTL must be > 0 when refresh is enabled".into(),
            ));
        }
        Ok(())
    }
}
