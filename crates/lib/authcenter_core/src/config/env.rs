//! Environment variable loading for [`JwtConfig`].

use std::str::FromStr;

use super::JwtConfig;
use crate::auth::AuthError;

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET`.
pub fn resolve_jwt_secret() -> Option<String> {
    ["JWT_SECRET", "AUTH_SECRET"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|secret| !secret.trim().is_empty())
}

pub(super) fn from_env() -> Result<JwtConfig, AuthError> {
    let defaults = JwtConfig::default();
    let config = JwtConfig {
        secret: resolve_jwt_secret().unwrap_or_default(),
        issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
        audience: match std::env::var("JWT_AUDIENCE") {
            Ok(raw) => split_list(&raw),
            Err(_) => defaults.audience,
        },
        access_ttl_secs: parse_var("JWT_ACCESS_TTL_SECS")?.unwrap_or(defaults.access_ttl_secs),
        refresh_enabled: parse_var("JWT_REFRESH_ENABLED")?.unwrap_or(defaults.refresh_enabled),
        refresh_ttl_secs: parse_var("JWT_REFRESH_TTL_SECS")?.unwrap_or(defaults.refresh_ttl_secs),
        clock_skew_secs: parse_var("JWT_CLOCK_SKEW_SECS")?.unwrap_or(defaults.clock_skew_secs),
    };
    Ok(config)
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, AuthError> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AuthError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
