use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use rolegate_core::UserId;

use crate::{RbacState, RbacStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorization contract for operations that need permissions.
///
/// Implement this on commands; callers check it with
/// [`Authorizer::authorize_requirement`] before dispatching.
pub trait PermissionRequirement {
    fn required_permissions(&self) -> &[&str];
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision logic (pure, over one consistent state)
// ─────────────────────────────────────────────────────────────────────────────

impl RbacState {
    /// True iff one of the user's roles holds a permission named exactly
    /// `permission` (surrounding whitespace ignored, as on input).
    pub fn user_has_permission(&self, user: UserId, permission: &str) -> bool {
        let Some(roles) = self.user_roles.get(&user) else {
            return false;
        };
        let Some(permission_id) = self.permission_names.get(permission.trim()) else {
            return false;
        };
        roles.iter().any(|role| {
            self.role_permissions
                .get(role)
                .is_some_and(|perms| perms.contains(permission_id))
        })
    }

    /// True iff one of the user's roles is named exactly `role` (trimmed).
    pub fn user_has_role(&self, user: UserId, role: &str) -> bool {
        let role = role.trim();
        self.user_roles.get(&user).is_some_and(|roles| {
            roles
                .iter()
                .any(|id| self.roles.get(id).is_some_and(|r| r.name == role))
        })
    }

    /// Union of the permission names granted by all of the user's roles.
    pub fn effective_permissions(&self, user: UserId) -> BTreeSet<String> {
        self.user_roles
            .get(&user)
            .into_iter()
            .flatten()
            .filter_map(|role| self.role_permissions.get(role))
            .flatten()
            .filter_map(|id| self.permissions.get(id))
            .map(|p| p.name.clone())
            .collect()
    }

    fn granting_roles(&self, user: UserId, permission: &str) -> Vec<String> {
        let permission = permission.trim();
        let mut out: Vec<String> = self
            .user_roles(user)
            .into_iter()
            .filter(|role| {
                self.role_permissions.get(&role.id).is_some_and(|perms| {
                    perms
                        .iter()
                        .any(|id| self.permissions.get(id).is_some_and(|p| p.name == permission))
                })
            })
            .map(|role| role.name)
            .collect();
        out.sort();
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Authorization engine over a backing store.
///
/// Every decision re-reads the store, so results always reflect the latest
/// committed role/permission state. Decisions fail closed: an unknown user,
/// an unknown permission, or an unavailable store all mean "deny".
#[derive(Debug, Clone)]
pub struct Authorizer<S> {
    store: S,
}

impl<S> Authorizer<S>
where
    S: RbacStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn authorize(&self, user: UserId, permission: &str) -> bool {
        self.decide("authorize", |s| s.user_has_permission(user, permission))
    }

    pub fn has_role(&self, user: UserId, role: &str) -> bool {
        self.decide("has_role", |s| s.user_has_role(user, role))
    }

    pub fn has_any_permission(&self, user: UserId, permissions: &[&str]) -> bool {
        self.decide("has_any_permission", |s| {
            permissions.iter().any(|p| s.user_has_permission(user, p))
        })
    }

    pub fn has_all_permissions(&self, user: UserId, permissions: &[&str]) -> bool {
        self.decide("has_all_permissions", |s| {
            permissions.iter().all(|p| s.user_has_permission(user, p))
        })
    }

    /// Effective permission names of `user` (empty when the store is unavailable).
    pub fn effective_permissions(&self, user: UserId) -> BTreeSet<String> {
        self.store
            .read(|s| s.effective_permissions(user))
            .unwrap_or_else(|e| {
                warn!(error = %e, user_id = %user, "effective permissions unavailable");
                BTreeSet::new()
            })
    }

    /// Guard form of [`Self::authorize`] for call sites that propagate with `?`.
    pub fn require(&self, user: UserId, permission: &str) -> Result<(), AuthzError> {
        if self.authorize(user, permission) {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(permission.to_string()))
        }
    }

    /// Check every permission an operation declares, in declaration order.
    pub fn authorize_requirement<R>(&self, user: UserId, requirement: &R) -> Result<(), AuthzError>
    where
        R: PermissionRequirement + ?Sized,
    {
        for permission in requirement.required_permissions() {
            self.require(user, permission)?;
        }
        Ok(())
    }

    /// Explain why a decision was made (or would be made).
    pub fn explain(&self, user: UserId, permission: &str) -> AuthorizationExplanation {
        match self.store.read(|s| explain_decision(s, user, permission)) {
            Ok(explanation) => explanation,
            Err(e) => {
                warn!(error = %e, user_id = %user, permission, "explain: store unavailable");
                AuthorizationExplanation {
                    user_id: user,
                    required_permission: permission.to_string(),
                    granted: false,
                    reason: "Authorization store is unavailable".to_string(),
                    roles: Vec::new(),
                    effective_permissions: Vec::new(),
                    granting_roles: Vec::new(),
                    denial_reason: Some(DenialReason {
                        kind: DenialKind::StoreUnavailable,
                        message: e.to_string(),
                        suggestions: vec!["Retry once the store is reachable".to_string()],
                    }),
                }
            }
        }
    }

    fn decide(&self, check: &'static str, f: impl FnOnce(&RbacState) -> bool) -> bool {
        self.store.read(f).unwrap_or_else(|e| {
            warn!(error = %e, check, "authorization store unavailable; denying");
            false
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub user_id: UserId,

    /// The permission that was being checked.
    pub required_permission: String,

    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Names of the user's roles.
    pub roles: Vec<String>,

    /// Sorted union of the permissions granted by those roles.
    pub effective_permissions: Vec<String>,

    /// Roles that grant the required permission.
    pub granting_roles: Vec<String>,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    UnknownUser,
    UnknownPermission,
    MissingPermission,
    StoreUnavailable,
}

fn explain_decision(state: &RbacState, user: UserId, permission: &str) -> AuthorizationExplanation {
    let permission = permission.trim();
    let roles: Vec<String> = state.user_roles(user).into_iter().map(|r| r.name).collect();
    let effective_permissions: Vec<String> = state.effective_permissions(user).into_iter().collect();
    let granting_roles = state.granting_roles(user, permission);
    let granted = !granting_roles.is_empty();

    let (reason, denial_reason) = if granted {
        (
            format!("Granted by role(s): {}", granting_roles.join(", ")),
            None,
        )
    } else if roles.is_empty() {
        (
            format!("User {user} has no roles"),
            Some(DenialReason {
                kind: DenialKind::UnknownUser,
                message: "The user has no role assignments".to_string(),
                suggestions: vec![format!(
                    "Assign a role that grants the '{permission}' permission"
                )],
            }),
        )
    } else if state.find_permission_by_name(permission).is_err() {
        (
            format!("Permission '{permission}' does not exist"),
            Some(DenialReason {
                kind: DenialKind::UnknownPermission,
                message: format!("No permission named '{permission}' is defined"),
                suggestions: vec![
                    "Check the permission name for typos (names are case-sensitive)".to_string(),
                    format!("Create the '{permission}' permission and grant it to a role"),
                ],
            }),
        )
    } else {
        let holders: Vec<String> = state
            .list_roles()
            .into_iter()
            .filter(|r| r.permissions.iter().any(|p| p.name == permission))
            .map(|r| r.role.name)
            .collect();
        let mut suggestions = vec![format!(
            "Grant the '{permission}' permission to one of the user's roles: {roles:?}"
        )];
        if !holders.is_empty() {
            suggestions.insert(0, format!("Assign one of the roles that grant it: {holders:?}"));
        }
        (
            format!(
                "None of the user's roles grant '{permission}'. Current permissions: {effective_permissions:?}"
            ),
            Some(DenialReason {
                kind: DenialKind::MissingPermission,
                message: format!("Missing required permission: '{permission}'"),
                suggestions,
            }),
        )
    };

    AuthorizationExplanation {
        user_id: user,
        required_permission: permission.to_string(),
        granted,
        reason,
        roles,
        effective_permissions,
        granting_roles,
        denial_reason,
    }
}
