use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rolegate_core::{DomainResult, Entity, PermissionId, ValueObject, normalize_name};

/// Validated permission name (e.g. "manage users").
///
/// Names are compared exactly after trimming; "Manage users" and
/// "manage users" are different permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionName(String);

impl PermissionName {
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

impl ValueObject for PermissionName {}

impl core::fmt::Display for PermissionName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named atomic capability checked by the authorization engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub(crate) fn new(name: PermissionName, now: DateTime<Utc>) -> Self {
        Self {
            id: PermissionId::new(),
            name: name.into_inner(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_but_case_preserved() {
        let name = PermissionName::parse("  Manage Users ").unwrap();
        assert_eq!(name.as_str(), "Manage Users");
    }

    #[test]
    fn blank_name_is_a_validation_error_on_name() {
        let err = PermissionName::parse(" ").unwrap_err();
        assert!(matches!(
            err,
            rolegate_core::DomainError::Validation { field: "name", .. }
        ));
    }
}
