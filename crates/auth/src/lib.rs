//! `rolegate-auth` — role/permission store and authorization engine.
//!
//! This crate is intentionally decoupled from HTTP and persistence formats.

pub mod authorize;
pub mod permissions;
pub mod roles;
pub mod seed;
pub mod state;
pub mod store;
pub mod user;

pub use authorize::{
    AuthorizationExplanation, Authorizer, AuthzError, DenialKind, DenialReason, PermissionRequirement,
};
pub use permissions::{Permission, PermissionName};
pub use roles::{Role, RoleName, RoleWithPermissions};
pub use seed::{Grants, SeedCatalog, SeedReport, SeedRole, SeededRole, seed};
pub use state::{RbacSnapshot, RbacState, RolePolicy, SyncChanges};
pub use store::{InMemoryRbacStore, RbacStore, RbacStoreExt};
pub use user::UserRoles;

pub use rolegate_core::{DomainError, DomainResult, EntityKind, PermissionId, RoleId, UserId};
