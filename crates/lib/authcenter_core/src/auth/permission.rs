//! Permission checks for protected operations.
//!
//! A [`Requirement`] names roles and permissions and combines them with
//! [`Mode::All`] or [`Mode::Any`]. Authority strings are opaque: `ROLE_ADMIN`
//! and `order:read` are matched the same way.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::AuthError;
use crate::models::auth::AuthenticatedUser;

/// How the strings in a [`Requirement`] are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every named role and permission must be held.
    #[default]
    All,
    /// At least one named role or permission must be held.
    Any,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub mode: Mode,
}

impl Requirement {
    /// Empty requirement in [`Mode::All`].
    pub fn all() -> Self {
        Self::default()
    }

    /// Empty requirement in [`Mode::Any`].
    pub fn any() -> Self {
        Self {
            mode: Mode::Any,
            ..Self::default()
        }
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// `true` when nothing is named; any authenticated user passes.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.roles.is_empty()
    }

    /// Roles then permissions.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().chain(self.permissions.iter()).map(String::as_str)
    }
}

/// Decides whether a user holds a single authority.
///
/// Swap in a custom checker for wildcard or attribute-based matching.
pub trait PermissionChecker: Send + Sync {
    fn has_authority(&self, user: &AuthenticatedUser, authority: &str) -> bool;
}

/// Exact string membership.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPermissionChecker;

impl PermissionChecker for DefaultPermissionChecker {
    fn has_authority(&self, user: &AuthenticatedUser, authority: &str) -> bool {
        user.has_authority(authority)
    }
}

#[derive(Clone)]
pub struct PermissionEvaluator {
    checker: Arc<dyn PermissionChecker>,
}

impl Default for PermissionEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(DefaultPermissionChecker))
    }
}

impl PermissionEvaluator {
    pub fn new(checker: Arc<dyn PermissionChecker>) -> Self {
        Self { checker }
    }

    /// Whether `user` satisfies `requirement`. No user never does.
    pub fn evaluate(&self, user: Option<&AuthenticatedUser>, requirement: &Requirement) -> bool {
        let Some(user) = user else {
            return false;
        };
        if requirement.is_empty() {
            return true;
        }
        let mut required = requirement.required();
        match requirement.mode {
            Mode::All => required.all(|authority| self.checker.has_authority(user, authority)),
            Mode::Any => required.any(|authority| self.checker.has_authority(user, authority)),
        }
    }

    /// [`evaluate`](Self::evaluate) as a guard. The error never names what
    /// was missing.
    pub fn check(&self, user: Option<&AuthenticatedUser>, requirement: &Requirement) -> Result<(), AuthError> {
        if self.evaluate(user, requirement) {
            return Ok(());
        }
        warn!(
            user_id = user.map(|u| u.user_id),
            required = ?requirement.required().collect::<Vec<_>>(),
            mode = ?requirement.mode,
            "permission denied"
        );
        Err(AuthError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::auth::Identity;

    use super::*;

    fn user(authorities: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser::from_identity(7, Identity::new(7, "u", authorities.iter().copied()), "jti")
    }

    #[test]
    fn combinators_over_roles_and_permissions() {
        let evaluator = PermissionEvaluator::default();
        let granted = user(&["A", "ROLE_X"]);

        let all = Requirement::all().role("ROLE_X").permissions(["A", "B"]);
        assert!(!evaluator.evaluate(Some(&granted), &all));

        let any = Requirement::any().role("ROLE_X").permissions(["A", "B"]);
        assert!(evaluator.evaluate(Some(&granted), &any));

        let satisfied = Requirement::all().role("ROLE_X").permission("A");
        assert!(evaluator.evaluate(Some(&granted), &satisfied));
    }

    #[test]
    fn no_identity_is_denied() {
        let evaluator = PermissionEvaluator::default();
        assert!(!evaluator.evaluate(None, &Requirement::any()));
        assert!(!evaluator.evaluate(None, &Requirement::all()));
        assert!(matches!(
            evaluator.check(None, &Requirement::all()),
            Err(AuthError::PermissionDenied)
        ));
    }

    #[test]
    fn empty_requirement_admits_any_identity() {
        let evaluator = PermissionEvaluator::default();
        let nobody = user(&[]);
        assert!(evaluator.evaluate(Some(&nobody), &Requirement::all()));
        assert!(evaluator.evaluate(Some(&nobody), &Requirement::any()));
    }

    #[test]
    fn matching_is_exact() {
        let evaluator = PermissionEvaluator::default();
        let granted = user(&["order:read"]);
        assert!(!evaluator.evaluate(Some(&granted), &Requirement::all().permission("order")));
        assert!(!evaluator.evaluate(Some(&granted), &Requirement::all().permission("ORDER:READ")));
        assert!(!evaluator.evaluate(Some(&granted), &Requirement::all().role("order:read:all")));
    }

    #[test]
    fn denial_is_generic() {
        let evaluator = PermissionEvaluator::default();
        let err = evaluator
            .check(Some(&user(&[])), &Requirement::all().permission("secret:perm"))
            .unwrap_err();
        assert!(!err.to_string().contains("secret:perm"));
    }

    struct PrefixChecker;

    impl PermissionChecker for PrefixChecker {
        fn has_authority(&self, user: &AuthenticatedUser, authority: &str) -> bool {
            user.authorities.iter().any(|granted| {
                granted == authority
                    || granted
                        .strip_suffix('*')
                        .is_some_and(|prefix| authority.starts_with(prefix))
            })
        }
    }

    #[test]
    fn custom_checker_is_used() {
        let evaluator = PermissionEvaluator::new(Arc::new(PrefixChecker));
        let granted = user(&["order:*"]);
        assert!(evaluator.evaluate(Some(&granted), &Requirement::all().permission("order:read")));
        assert!(!evaluator.evaluate(Some(&granted), &Requirement::all().permission("user:read")));
    }

    #[test]
    fn requirement_deserializes_with_defaults() {
        let requirement: Requirement =
            serde_json::from_value(serde_json::json!({ "permissions": ["api:query"], "mode": "any" }))
                .unwrap();
        assert_eq!(requirement.mode, Mode::Any);
        assert!(requirement.roles.is_empty());
    }
}
