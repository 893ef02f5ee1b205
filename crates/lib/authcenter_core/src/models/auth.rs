//! Authentication domain models.
//!
//! These are internal domain models, distinct from the request/response
//! shapes in `authcenter_api::models`.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A user as supplied by the host's directory.
///
/// `authorities` mixes role markers (`ROLE_ADMIN`) and permission strings
/// (`order:read`); the core treats both as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub authorities: Vec<String>,
}

impl Identity {
    pub fn new<I, S>(user_id: i64, username: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id,
            username: username.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }
}

/// Token type claim (`typ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims carried by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,
    /// Subject: the user id, stringified.
    #[serde(default)]
    pub sub: String,
    /// Audience. Decodes from either a single string or an array.
    #[serde(default, deserialize_with = "one_or_many")]
    pub aud: Vec<String>,
    /// Token id, the revocation key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issued at (unix seconds).
    #[serde(default)]
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    pub typ: TokenType,
    /// Login name; access tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Authorities snapshot at issuance; access tokens only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorities: Vec<String>,
}

impl TokenClaims {
    /// The user id from `sub`, if it is a well-formed integer.
    pub fn user_id(&self) -> Option<i64> {
        let sub = self.sub.trim();
        if sub.is_empty() {
            return None;
        }
        sub.parse().ok()
    }

    /// The `jti` claim, ignoring blank values.
    pub fn token_id(&self) -> Option<&str> {
        self.jti.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    /// Strict expiry check with no leeway.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let values = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    };
    Ok(values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .collect())
}

/// Access token plus (optionally) a refresh token, as handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    /// `None` when refresh issuance is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// The identity attached to a request once the pipeline has accepted its
/// credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Principal.
    pub user_id: i64,
    pub username: String,
    /// Granted authorities, as currently held by the directory.
    pub authorities: HashSet<String>,
    /// `jti` of the access token that authenticated this request.
    pub token_id: String,
}

impl AuthenticatedUser {
    pub fn from_identity(user_id: i64, identity: Identity, token_id: impl Into<String>) -> Self {
        Self {
            user_id,
            username: identity.username,
            authorities: identity.authorities.into_iter().collect(),
            token_id: token_id.into(),
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Authorities in a stable order, for responses and logs.
    pub fn sorted_authorities(&self) -> Vec<String> {
        let mut authorities: Vec<String> = self.authorities.iter().cloned().collect();
        authorities.sort();
        authorities
    }
}
