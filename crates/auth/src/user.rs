//! User–role assignment.
//!
//! Users are owned by the host application and only known here through
//! their role memberships: a user with no roles has no entry at all.

use std::collections::BTreeSet;

use serde::Serialize;

use rolegate_core::{DomainError, DomainResult, EntityKind, RoleId, UserId, sort_by_name};

use crate::{RbacState, Role, SyncChanges};

/// Resolved view of a user's roles (sorted by name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRoles {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl UserRoles {
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|r| r.name.as_str()).collect()
    }
}

impl RbacState {
    /// Attach `role` to `user`. Returns `false` if it was already attached.
    pub fn assign_role(&mut self, user: UserId, role: RoleId) -> DomainResult<bool> {
        self.role(role)?;
        let inserted = self.user_roles.entry(user).or_default().insert(role);
        self.role_users.entry(role).or_default().insert(user);
        Ok(inserted)
    }

    /// Detach `role` from `user`. Returns `false` if it was not attached.
    pub fn revoke_role(&mut self, user: UserId, role: RoleId) -> bool {
        let Some(roles) = self.user_roles.get_mut(&user) else {
            return false;
        };
        let removed = roles.remove(&role);
        if roles.is_empty() {
            self.user_roles.remove(&user);
        }
        if let Some(users) = self.role_users.get_mut(&role) {
            users.remove(&user);
            if users.is_empty() {
                self.role_users.remove(&role);
            }
        }
        removed
    }

    /// Replace the user's entire role set.
    pub fn sync_user_roles(&mut self, user: UserId, roles: &[RoleId]) -> DomainResult<SyncChanges<RoleId>> {
        let wanted: BTreeSet<RoleId> = roles
            .iter()
            .map(|id| self.role(*id).map(|r| r.id))
            .collect::<DomainResult<_>>()?;
        let current = self.user_roles.get(&user).cloned().unwrap_or_default();

        let detached: Vec<RoleId> = current.difference(&wanted).copied().collect();
        let attached: Vec<RoleId> = wanted.difference(&current).copied().collect();

        for role in &detached {
            self.revoke_role(user, *role);
        }
        for role in &attached {
            self.assign_role(user, *role)?;
        }
        Ok(SyncChanges { attached, detached })
    }

    /// The user's roles, sorted by name. Unknown users have none.
    pub fn user_roles(&self, user: UserId) -> Vec<Role> {
        let mut out: Vec<Role> = self
            .user_roles
            .get(&user)
            .into_iter()
            .flatten()
            .filter_map(|id| self.roles.get(id).cloned())
            .collect();
        sort_by_name(&mut out);
        out
    }

    pub fn user_roles_view(&self, user: UserId) -> UserRoles {
        UserRoles {
            user_id: user,
            roles: self.user_roles(user),
        }
    }

    /// Users holding `role`, in id order.
    pub fn role_users(&self, role: RoleId) -> DomainResult<Vec<UserId>> {
        if !self.roles.contains_key(&role) {
            return Err(DomainError::not_found(EntityKind::Role, role));
        }
        Ok(self
            .role_users
            .get(&role)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default())
    }

    pub(crate) fn detach_role_from_users(&mut self, role: RoleId) {
        for user in self.role_users.remove(&role).unwrap_or_default() {
            if let Some(roles) = self.user_roles.get_mut(&user) {
                roles.remove(&role);
                if roles.is_empty() {
                    self.user_roles.remove(&user);
                }
            }
        }
    }
}
