//! Idempotent bootstrap of the permission catalog and the built-in roles.

use serde::{Deserialize, Serialize};
use tracing::info;

use rolegate_core::{DomainResult, PermissionId};

use crate::{RbacState, RbacStore};

/// Which permissions a seeded role is synced to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grants {
    /// Every permission in the store at seed time (not only the catalog's).
    All,
    /// Exactly these permission names.
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRole {
    pub name: String,
    pub grants: Grants,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCatalog {
    pub permissions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<SeedRole>,
}

const DEFAULT_PERMISSIONS: [&str; 17] = [
    "view users",
    "manage users",
    "edit users",
    "delete users",
    "view roles",
    "manage roles",
    "edit roles",
    "delete roles",
    "view products",
    "manage products",
    "edit products",
    "delete products",
    "view orders",
    "manage orders",
    "edit orders",
    "delete orders",
    "manage permissions",
];

impl Default for SeedCatalog {
    fn default() -> Self {
        Self {
            permissions: DEFAULT_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
            roles: vec![
                SeedRole {
                    name: "admin".to_string(),
                    grants: Grants::All,
                },
                SeedRole {
                    name: "editor".to_string(),
                    grants: Grants::Only(vec![
                        "view users".to_string(),
                        "manage users".to_string(),
                        "edit users".to_string(),
                    ]),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub roles_created: usize,
    pub roles: Vec<SeededRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeededRole {
    pub name: String,
    pub permissions: usize,
    pub attached: usize,
    pub detached: usize,
}

impl RbacState {
    /// Apply `catalog`: first-or-create every permission and role, then sync
    /// each role to its grant set.
    pub fn apply_seed(&mut self, catalog: &SeedCatalog) -> DomainResult<SeedReport> {
        let mut report = SeedReport::default();

        for name in &catalog.permissions {
            let (_, created) = self.first_or_create_permission(name)?;
            report.permissions_created += usize::from(created);
        }

        for seed_role in &catalog.roles {
            let (role, created) = self.first_or_create_role(&seed_role.name)?;
            report.roles_created += usize::from(created);

            let ids: Vec<PermissionId> = match &seed_role.grants {
                Grants::All => self.permissions.keys().copied().collect(),
                Grants::Only(names) => names
                    .iter()
                    .map(|n| self.find_permission_by_name(n).map(|p| p.id))
                    .collect::<DomainResult<_>>()?,
            };
            let changes = self.sync_role_permissions(role.id, &ids)?;

            report.roles.push(SeededRole {
                name: role.name,
                permissions: self.role_permissions.get(&role.id).map_or(0, |s| s.len()),
                attached: changes.attached.len(),
                detached: changes.detached.len(),
            });
        }

        Ok(report)
    }
}

/// Run the seeder against `store` in a single transaction.
pub fn seed<S: RbacStore>(store: &S, catalog: &SeedCatalog) -> DomainResult<SeedReport> {
    let report = store.write(|s| s.apply_seed(catalog))?;
    info!(
        permissions_created = report.permissions_created,
        roles_created = report.roles_created,
        roles = report.roles.len(),
        "seed applied"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryRbacStore, RbacStoreExt};

    fn names(store: &InMemoryRbacStore, role: &str) -> Vec<String> {
        let id = store.find_role_by_name(role).unwrap().id;
        let mut out: Vec<String> = store
            .role(id)
            .unwrap()
            .permissions
            .into_iter()
            .map(|p| p.name)
            .collect();
        out.sort();
        out
    }

    #[test]
    fn seeding_twice_is_idempotent() {
        let store = InMemoryRbacStore::new();
        let catalog = SeedCatalog::default();

        let first = seed(&store, &catalog).unwrap();
        assert_eq!(first.permissions_created, 17);
        assert_eq!(first.roles_created, 2);

        let second = seed(&store, &catalog).unwrap();
        assert_eq!(second.permissions_created, 0);
        assert_eq!(second.roles_created, 0);
        assert!(second.roles.iter().all(|r| r.attached == 0 && r.detached == 0));

        let roles = store.list_roles().unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(store.list_permissions().unwrap().len(), 17);
        assert_eq!(names(&store, "admin").len(), 17);
        assert_eq!(names(&store, "editor"), vec!["edit users", "manage users", "view users"]);
    }

    #[test]
    fn admin_receives_permissions_created_outside_the_catalog() {
        let store = InMemoryRbacStore::new();
        store.create_permission("export reports").unwrap();
        seed(&store, &SeedCatalog::default()).unwrap();
        assert!(names(&store, "admin").contains(&"export reports".to_string()));
    }

    #[test]
    fn seeding_resyncs_drifted_roles() {
        let store = InMemoryRbacStore::new();
        seed(&store, &SeedCatalog::default()).unwrap();
        let editor = store.find_role_by_name("editor").unwrap();
        let delete = store.find_permission_by_name("delete orders").unwrap();
        store.sync_role_permissions(editor.id, &[delete.id]).unwrap();

        let report = seed(&store, &SeedCatalog::default()).unwrap();
        let editor_report = report.roles.iter().find(|r| r.name == "editor").unwrap();
        assert_eq!(editor_report.attached, 3);
        assert_eq!(editor_report.detached, 1);
        assert_eq!(names(&store, "editor"), vec!["edit users", "manage users", "view users"]);
    }

    #[test]
    fn unknown_grant_commits_nothing() {
        let store = InMemoryRbacStore::new();
        let catalog = SeedCatalog {
            permissions: vec!["view users".to_string()],
            roles: vec![SeedRole {
                name: "editor".to_string(),
                grants: Grants::Only(vec!["missing".to_string()]),
            }],
        };
        assert!(seed(&store, &catalog).unwrap_err().is_not_found());
        assert!(store.list_permissions().unwrap().is_empty());
        assert!(store.list_roles().unwrap().is_empty());
    }

    #[test]
    fn catalog_deserializes_from_json() {
        let json = r#"{
            "permissions": ["a", "b"],
            "roles": [
                {"name": "root", "grants": "all"},
                {"name": "reader", "grants": {"only": ["a"]}}
            ]
        }"#;
        let catalog: SeedCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.roles[0].grants, Grants::All);
        assert_eq!(catalog.roles[1].grants, Grants::Only(vec!["a".to_string()]));
    }
}
