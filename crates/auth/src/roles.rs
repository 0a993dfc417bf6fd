use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rolegate_core::{DomainResult, Entity, RoleId, ValueObject, normalize_name};

use crate::Permission;

/// Validated role name (e.g. "editor").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        normalize_name("name", raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl ValueObject for RoleName {}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named bundle of permissions assignable to users.
///
/// The permission set itself lives in the store's relation indexes; use
/// [`RoleWithPermissions`] for a resolved view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub(crate) fn new(name: RoleName, now: DateTime<Utc>) -> Self {
        Self {
            id: RoleId::new(),
            name: name.into_inner(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A role together with its resolved permissions (sorted by name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl RoleWithPermissions {
    pub fn permission_names(&self) -> Vec<&str> {
        self.permissions.iter().map(|p| p.name.as_str()).collect()
    }
}

impl Entity for RoleWithPermissions {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.role.id
    }

    fn name(&self) -> &str {
        &self.role.name
    }
}
