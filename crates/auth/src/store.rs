//! Backing store abstraction and its in-memory implementation.
//!
//! A store is the single shared resource of the engine. Reads see one
//! consistent [`RbacState`]. Multi-step writes are transactional: the
//! closure runs against a draft and is committed only if it returns `Ok`.
//! Single operations already validate before mutating, so they run in
//! place through [`RbacStore::apply`] and skip the copy.
//!
//! A panic inside a closure poisons the in-memory lock. The committed state
//! is still whole at that point (a panicking draft is dropped), so the lock
//! is recovered instead of failing every later call.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use rolegate_core::{DomainResult, PermissionId, RoleId, UserId};

use crate::{
    Permission, RbacSnapshot, RbacState, Role, RolePolicy, RoleWithPermissions, SyncChanges, UserRoles,
};

/// Transactional access to RBAC state.
pub trait RbacStore: Send + Sync {
    /// Run `f` against a consistent view of the state.
    fn read<T>(&self, f: impl FnOnce(&RbacState) -> T) -> DomainResult<T>;

    /// Run `f` as one atomic transaction. Nothing is committed on `Err`.
    fn write<T>(&self, f: impl FnOnce(&mut RbacState) -> DomainResult<T>) -> DomainResult<T>;

    /// Run a single validate-then-mutate operation.
    ///
    /// `f` must check all of its inputs before changing anything, must only
    /// return `Err` from an untouched state, and must not panic. Stores may
    /// then run it in place without a draft. Defaults to [`RbacStore::write`].
    fn apply<T>(&self, f: impl FnOnce(&mut RbacState) -> DomainResult<T>) -> DomainResult<T> {
        self.write(f)
    }
}

impl<S> RbacStore for Arc<S>
where
    S: RbacStore,
{
    fn read<T>(&self, f: impl FnOnce(&RbacState) -> T) -> DomainResult<T> {
        (**self).read(f)
    }

    fn write<T>(&self, f: impl FnOnce(&mut RbacState) -> DomainResult<T>) -> DomainResult<T> {
        (**self).write(f)
    }

    fn apply<T>(&self, f: impl FnOnce(&mut RbacState) -> DomainResult<T>) -> DomainResult<T> {
        (**self).apply(f)
    }
}

/// In-memory store for tests, the seed tool and single-process hosts.
#[derive(Debug, Default)]
pub struct InMemoryRbacStore {
    inner: RwLock<RbacState>,
}

impl InMemoryRbacStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RolePolicy) -> Self {
        Self::from_state(RbacState::new(policy))
    }

    pub fn from_state(state: RbacState) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }

    pub fn from_snapshot(snapshot: RbacSnapshot, policy: RolePolicy) -> DomainResult<Self> {
        Ok(Self::from_state(RbacState::from_snapshot(snapshot, policy)?))
    }

    pub fn snapshot(&self) -> DomainResult<RbacSnapshot> {
        self.read(RbacState::snapshot)
    }
}

impl RbacStore for InMemoryRbacStore {
    fn read<T>(&self, f: impl FnOnce(&RbacState) -> T) -> DomainResult<T> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&*state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut RbacState) -> DomainResult<T>) -> DomainResult<T> {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut draft = state.clone();
        let out = f(&mut draft)?;
        *state = draft;
        Ok(out)
    }

    fn apply<T>(&self, f: impl FnOnce(&mut RbacState) -> DomainResult<T>) -> DomainResult<T> {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *state)
    }
}

/// Named store operations, each running in its own transaction.
pub trait RbacStoreExt: RbacStore {
    fn create_permission(&self, name: &str) -> DomainResult<Permission> {
        let permission = self.apply(|s| s.create_permission(name))?;
        info!(permission_id = %permission.id, name = %permission.name, "permission created");
        Ok(permission)
    }

    fn rename_permission(&self, id: PermissionId, name: &str) -> DomainResult<Permission> {
        let permission = self.apply(|s| s.rename_permission(id, name))?;
        info!(permission_id = %id, name = %permission.name, "permission renamed");
        Ok(permission)
    }

    fn delete_permission(&self, id: PermissionId) -> DomainResult<()> {
        self.apply(|s| s.delete_permission(id))?;
        info!(permission_id = %id, "permission deleted");
        Ok(())
    }

    fn list_permissions(&self) -> DomainResult<Vec<Permission>> {
        self.read(RbacState::list_permissions)
    }

    fn find_permission_by_name(&self, name: &str) -> DomainResult<Permission> {
        self.read(|s| s.find_permission_by_name(name).cloned())?
    }

    fn create_role(&self, name: &str, permission_ids: &[PermissionId]) -> DomainResult<Role> {
        let role = self.apply(|s| s.create_role(name, permission_ids))?;
        info!(role_id = %role.id, name = %role.name, permissions = permission_ids.len(), "role created");
        Ok(role)
    }

    fn update_role(&self, id: RoleId, name: &str, permission_ids: &[PermissionId]) -> DomainResult<Role> {
        let (role, changes) = self.apply(|s| s.update_role(id, name, permission_ids))?;
        info!(role_id = %id, name = %role.name, "role updated");
        log_sync("role permissions", &changes);
        Ok(role)
    }

    fn delete_role(&self, id: RoleId) -> DomainResult<()> {
        let role = self.apply(|s| s.delete_role(id))?;
        info!(role_id = %id, name = %role.name, "role deleted");
        Ok(())
    }

    fn sync_role_permissions(
        &self,
        id: RoleId,
        permission_ids: &[PermissionId],
    ) -> DomainResult<SyncChanges<PermissionId>> {
        let changes = self.apply(|s| s.sync_role_permissions(id, permission_ids))?;
        log_sync("role permissions", &changes);
        Ok(changes)
    }

    fn role(&self, id: RoleId) -> DomainResult<RoleWithPermissions> {
        self.read(|s| s.role_with_permissions(id))?
    }

    fn find_role_by_name(&self, name: &str) -> DomainResult<Role> {
        self.read(|s| s.find_role_by_name(name).cloned())?
    }

    fn list_roles(&self) -> DomainResult<Vec<RoleWithPermissions>> {
        self.read(RbacState::list_roles)
    }

    fn assign_role(&self, user: UserId, role: RoleId) -> DomainResult<bool> {
        let attached = self.apply(|s| s.assign_role(user, role))?;
        debug!(user_id = %user, role_id = %role, attached, "role assigned");
        Ok(attached)
    }

    fn revoke_role(&self, user: UserId, role: RoleId) -> DomainResult<bool> {
        let detached = self.apply(|s| Ok(s.revoke_role(user, role)))?;
        debug!(user_id = %user, role_id = %role, detached, "role revoked");
        Ok(detached)
    }

    fn sync_user_roles(&self, user: UserId, roles: &[RoleId]) -> DomainResult<SyncChanges<RoleId>> {
        let changes = self.apply(|s| s.sync_user_roles(user, roles))?;
        log_sync("user roles", &changes);
        Ok(changes)
    }

    fn user_roles(&self, user: UserId) -> DomainResult<UserRoles> {
        self.read(|s| s.user_roles_view(user))
    }
}

impl<S: RbacStore> RbacStoreExt for S {}

fn log_sync<Id: core::fmt::Debug>(relation: &'static str, changes: &SyncChanges<Id>) {
    debug!(
        relation,
        attached = ?changes.attached,
        detached = ?changes.detached,
        "relation synced"
    );
}
