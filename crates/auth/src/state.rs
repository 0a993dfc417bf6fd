//! In-memory RBAC state: id-indexed records plus bidirectional relation sets.
//!
//! `RbacState` holds the domain logic for the permission and role stores. It
//! performs no locking; [`crate::store`] wraps it in a transaction boundary.
//!
//! Every mutating operation validates all of its inputs before touching any
//! index, so an `Err` always leaves the state as it was.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use rolegate_core::{DomainError, DomainResult, EntityKind, PermissionId, RoleId, UserId, sort_by_name};

use crate::{Permission, PermissionName, Role, RoleName, RoleWithPermissions};

/// Validation policy for role writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    /// Reject `create_role` / `update_role` calls with an empty permission list.
    pub require_permissions: bool,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            require_permissions: true,
        }
    }
}

/// Outcome of a full-replace ("sync") of a relation's membership set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncChanges<Id> {
    pub attached: Vec<Id>,
    pub detached: Vec<Id>,
}

impl<Id> SyncChanges<Id> {
    pub fn is_noop(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}

/// Serializable form of the whole state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacSnapshot {
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub role_permissions: Vec<(RoleId, PermissionId)>,
    #[serde(default)]
    pub user_roles: Vec<(UserId, RoleId)>,
}

#[derive(Debug, Clone, Default)]
pub struct RbacState {
    pub(crate) policy: RolePolicy,
    pub(crate) permissions: HashMap<PermissionId, Permission>,
    pub(crate) permission_names: HashMap<String, PermissionId>,
    pub(crate) roles: HashMap<RoleId, Role>,
    pub(crate) role_names: HashMap<String, RoleId>,
    pub(crate) role_permissions: HashMap<RoleId, BTreeSet<PermissionId>>,
    pub(crate) permission_roles: HashMap<PermissionId, BTreeSet<RoleId>>,
    pub(crate) user_roles: HashMap<UserId, BTreeSet<RoleId>>,
    pub(crate) role_users: HashMap<RoleId, BTreeSet<UserId>>,
}

impl RbacState {
    pub fn new(policy: RolePolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> RolePolicy {
        self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_permission(&mut self, name: &str) -> DomainResult<Permission> {
        let name = PermissionName::parse(name)?;
        self.ensure_permission_name_free(name.as_str(), None)?;

        let permission = Permission::new(name, Utc::now());
        self.insert_permission(permission.clone());
        Ok(permission)
    }

    /// Return the permission with `name`, creating it if absent.
    ///
    /// The boolean is `true` when the permission was created by this call.
    pub fn first_or_create_permission(&mut self, name: &str) -> DomainResult<(Permission, bool)> {
        let parsed = PermissionName::parse(name)?;
        if let Some(id) = self.permission_names.get(parsed.as_str()) {
            return Ok((self.permission(*id)?.clone(), false));
        }
        Ok((self.create_permission(parsed.as_str())?, true))
    }

    pub fn rename_permission(&mut self, id: PermissionId, name: &str) -> DomainResult<Permission> {
        let name = PermissionName::parse(name)?;
        let old_name = self.permission(id)?.name.clone();
        self.ensure_permission_name_free(name.as_str(), Some(id))?;

        if old_name == name.as_str() {
            return self.permission(id).cloned();
        }

        self.permission_names.remove(&old_name);
        self.permission_names.insert(name.as_str().to_string(), id);
        let permission = self
            .permissions
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Permission, id))?;
        permission.name = name.into_inner();
        permission.updated_at = Utc::now();
        Ok(permission.clone())
    }

    /// Delete a permission and detach it from every role.
    pub fn delete_permission(&mut self, id: PermissionId) -> DomainResult<()> {
        let permission = self
            .permissions
            .remove(&id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Permission, id))?;
        self.permission_names.remove(&permission.name);

        for role_id in self.permission_roles.remove(&id).unwrap_or_default() {
            if let Some(set) = self.role_permissions.get_mut(&role_id) {
                set.remove(&id);
            }
        }
        Ok(())
    }

    pub fn permission(&self, id: PermissionId) -> DomainResult<&Permission> {
        self.permissions
            .get(&id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Permission, id))
    }

    pub fn find_permission_by_name(&self, name: &str) -> DomainResult<&Permission> {
        let name = name.trim();
        self.permission_names
            .get(name)
            .and_then(|id| self.permissions.get(id))
            .ok_or_else(|| DomainError::not_found(EntityKind::Permission, name))
    }

    /// All permissions, sorted by name.
    pub fn list_permissions(&self) -> Vec<Permission> {
        let mut out: Vec<Permission> = self.permissions.values().cloned().collect();
        sort_by_name(&mut out);
        out
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_role(&mut self, name: &str, permission_ids: &[PermissionId]) -> DomainResult<Role> {
        let (name, wanted) = self.validate_role_form(None, name, permission_ids)?;

        let role = Role::new(name, Utc::now());
        self.insert_role(role.clone());
        self.replace_role_permissions(role.id, wanted);
        Ok(role)
    }

    /// Rename a role and fully resync its permission set.
    ///
    /// The role is resolved before the form is looked at, so a missing role
    /// is `NotFound` whatever the input. The role may keep its own name.
    pub fn update_role(
        &mut self,
        id: RoleId,
        name: &str,
        permission_ids: &[PermissionId],
    ) -> DomainResult<(Role, SyncChanges<PermissionId>)> {
        let old_name = self.role(id)?.name.clone();
        let (name, wanted) = self.validate_role_form(Some(id), name, permission_ids)?;

        if old_name != name.as_str() {
            self.role_names.remove(&old_name);
            self.role_names.insert(name.as_str().to_string(), id);
            if let Some(role) = self.roles.get_mut(&id) {
                role.name = name.into_inner();
                role.updated_at = Utc::now();
            }
        }

        let changes = self.replace_role_permissions(id, wanted);
        Ok((self.role(id)?.clone(), changes))
    }

    /// Delete a role, removing it from every user and detaching its permissions.
    pub fn delete_role(&mut self, id: RoleId) -> DomainResult<Role> {
        let role = self
            .roles
            .remove(&id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Role, id))?;
        self.role_names.remove(&role.name);

        for permission_id in self.role_permissions.remove(&id).unwrap_or_default() {
            if let Some(set) = self.permission_roles.get_mut(&permission_id) {
                set.remove(&id);
                if set.is_empty() {
                    self.permission_roles.remove(&permission_id);
                }
            }
        }
        self.detach_role_from_users(id);
        Ok(role)
    }

    /// Replace the role's entire permission set.
    ///
    /// Unlike create/update, an empty set is accepted and detaches everything.
    pub fn sync_role_permissions(
        &mut self,
        id: RoleId,
        permission_ids: &[PermissionId],
    ) -> DomainResult<SyncChanges<PermissionId>> {
        self.role(id)?;
        let wanted = self.resolve_permission_ids(permission_ids)?;
        Ok(self.replace_role_permissions(id, wanted))
    }

    /// Return the role with `name`, creating it (with no permissions) if absent.
    pub fn first_or_create_role(&mut self, name: &str) -> DomainResult<(Role, bool)> {
        let name = RoleName::parse(name)?;
        if let Some(id) = self.role_names.get(name.as_str()) {
            return Ok((self.role(*id)?.clone(), false));
        }
        let role = Role::new(name, Utc::now());
        self.insert_role(role.clone());
        Ok((role, true))
    }

    pub fn role(&self, id: RoleId) -> DomainResult<&Role> {
        self.roles
            .get(&id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Role, id))
    }

    pub fn find_role_by_name(&self, name: &str) -> DomainResult<&Role> {
        let name = name.trim();
        self.role_names
            .get(name)
            .and_then(|id| self.roles.get(id))
            .ok_or_else(|| DomainError::not_found(EntityKind::Role, name))
    }

    /// The role's permissions, sorted by name.
    pub fn role_permissions(&self, id: RoleId) -> DomainResult<Vec<Permission>> {
        self.role(id)?;
        let mut out: Vec<Permission> = self
            .role_permissions
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|pid| self.permissions.get(pid).cloned())
            .collect();
        sort_by_name(&mut out);
        Ok(out)
    }

    pub fn role_with_permissions(&self, id: RoleId) -> DomainResult<RoleWithPermissions> {
        Ok(RoleWithPermissions {
            role: self.role(id)?.clone(),
            permissions: self.role_permissions(id)?,
        })
    }

    /// All roles with their permissions, sorted by role name.
    pub fn list_roles(&self) -> Vec<RoleWithPermissions> {
        let mut out: Vec<RoleWithPermissions> = self
            .roles
            .keys()
            .filter_map(|id| self.role_with_permissions(*id).ok())
            .collect();
        sort_by_name(&mut out);
        out
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> RbacSnapshot {
        let mut role_permissions: Vec<(RoleId, PermissionId)> = self
            .role_permissions
            .iter()
            .flat_map(|(role, perms)| perms.iter().map(move |p| (*role, *p)))
            .collect();
        role_permissions.sort();

        let mut user_roles: Vec<(UserId, RoleId)> = self
            .user_roles
            .iter()
            .flat_map(|(user, roles)| roles.iter().map(move |r| (*user, *r)))
            .collect();
        user_roles.sort();

        let mut roles: Vec<Role> = self.roles.values().cloned().collect();
        sort_by_name(&mut roles);

        RbacSnapshot {
            permissions: self.list_permissions(),
            roles,
            role_permissions,
            user_roles,
        }
    }

    /// Rebuild state (and every index) from a snapshot.
    ///
    /// Names are normalised as on input, so padded names are trimmed and
    /// blank ones rejected. Duplicate names or relation pairs pointing at
    /// missing records are rejected.
    pub fn from_snapshot(snapshot: RbacSnapshot, policy: RolePolicy) -> DomainResult<Self> {
        let mut state = Self::new(policy);

        for mut permission in snapshot.permissions {
            if state.permissions.contains_key(&permission.id) {
                return Err(DomainError::invalid_id(format!(
                    "duplicate permission id {}",
                    permission.id
                )));
            }
            permission.name = PermissionName::parse(&permission.name)?.into_inner();
            state.ensure_permission_name_free(&permission.name, None)?;
            state.insert_permission(permission);
        }

        for mut role in snapshot.roles {
            if state.roles.contains_key(&role.id) {
                return Err(DomainError::invalid_id(format!("duplicate role id {}", role.id)));
            }
            role.name = RoleName::parse(&role.name)?.into_inner();
            state.ensure_role_name_free(&role.name, None)?;
            state.insert_role(role);
        }

        for (role_id, permission_id) in snapshot.role_permissions {
            state.role(role_id)?;
            state.permission(permission_id)?;
            state.role_permissions.entry(role_id).or_default().insert(permission_id);
            state.permission_roles.entry(permission_id).or_default().insert(role_id);
        }

        for (user_id, role_id) in snapshot.user_roles {
            state.assign_role(user_id, role_id)?;
        }

        Ok(state)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn insert_permission(&mut self, permission: Permission) {
        self.permission_names.insert(permission.name.clone(), permission.id);
        self.permissions.insert(permission.id, permission);
    }

    fn insert_role(&mut self, role: Role) {
        self.role_names.insert(role.name.clone(), role.id);
        self.role_permissions.entry(role.id).or_default();
        self.roles.insert(role.id, role);
    }

    fn ensure_permission_name_free(&self, name: &str, except: Option<PermissionId>) -> DomainResult<()> {
        match self.permission_names.get(name) {
            Some(id) if Some(*id) != except => Err(DomainError::duplicate_name(EntityKind::Permission, name)),
            _ => Ok(()),
        }
    }

    fn ensure_role_name_free(&self, name: &str, except: Option<RoleId>) -> DomainResult<()> {
        match self.role_names.get(name) {
            Some(id) if Some(*id) != except => Err(DomainError::duplicate_name(EntityKind::Role, name)),
            _ => Ok(()),
        }
    }

    /// Check a role form, collecting one error per failing field.
    ///
    /// `name` is checked for presence, length and then uniqueness (ignoring
    /// `except`); `permissions` for presence and then existence.
    fn validate_role_form(
        &self,
        except: Option<RoleId>,
        name: &str,
        permission_ids: &[PermissionId],
    ) -> DomainResult<(RoleName, BTreeSet<PermissionId>)> {
        let name = RoleName::parse(name).and_then(|name| {
            self.ensure_role_name_free(name.as_str(), except)?;
            Ok(name)
        });
        let wanted = self
            .ensure_permissions_supplied(permission_ids)
            .and_then(|()| self.resolve_permission_ids(permission_ids));

        match (name, wanted) {
            (Ok(name), Ok(wanted)) => Ok((name, wanted)),
            (name, wanted) => Err(DomainError::from_errors(
                [name.err(), wanted.err()].into_iter().flatten().collect(),
            )),
        }
    }

    fn ensure_permissions_supplied(&self, permission_ids: &[PermissionId]) -> DomainResult<()> {
        if self.policy.require_permissions && permission_ids.is_empty() {
            return Err(DomainError::validation(
                "permissions",
                "select at least one permission",
            ));
        }
        Ok(())
    }

    fn resolve_permission_ids(&self, permission_ids: &[PermissionId]) -> DomainResult<BTreeSet<PermissionId>> {
        permission_ids
            .iter()
            .map(|id| self.permission(*id).map(|p| p.id))
            .collect()
    }

    fn replace_role_permissions(
        &mut self,
        role_id: RoleId,
        wanted: BTreeSet<PermissionId>,
    ) -> SyncChanges<PermissionId> {
        let current = self.role_permissions.entry(role_id).or_default();
        let detached: Vec<PermissionId> = current.difference(&wanted).copied().collect();
        let attached: Vec<PermissionId> = wanted.difference(current).copied().collect();
        *current = wanted;

        for permission_id in &detached {
            if let Some(set) = self.permission_roles.get_mut(permission_id) {
                set.remove(&role_id);
                if set.is_empty() {
                    self.permission_roles.remove(permission_id);
                }
            }
        }
        for permission_id in &attached {
            self.permission_roles.entry(*permission_id).or_default().insert(role_id);
        }

        SyncChanges { attached, detached }
    }
}
