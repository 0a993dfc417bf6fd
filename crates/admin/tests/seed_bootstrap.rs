//! Black-box checks of the seed tool against a real snapshot file.

use std::fs;

use rolegate_admin::{AdminConfig, RoleAdmin, RoleForm, SnapshotFile, run_seed};
use rolegate_auth::{Authorizer, RbacStoreExt, RolePolicy, UserId};

fn config_in(dir: &tempfile::TempDir) -> AdminConfig {
    AdminConfig {
        store_path: dir.path().join("rbac.json"),
        ..AdminConfig::default()
    }
}

#[test]
fn seeding_twice_yields_one_admin_and_one_editor() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    let first = run_seed(&config).unwrap();
    assert_eq!(first.roles_created, 2);
    let second = run_seed(&config).unwrap();
    assert_eq!(second.roles_created, 0);
    assert_eq!(second.permissions_created, 0);

    let store = SnapshotFile::new(&config.store_path)
        .open_store(RolePolicy::default())
        .unwrap();
    let roles = store.list_roles().unwrap();
    let names: Vec<&str> = roles.iter().map(|r| r.role.name.as_str()).collect();
    assert_eq!(names, vec!["admin", "editor"]);
    assert_eq!(roles[0].permissions.len(), 17);
    assert_eq!(
        roles[1].permission_names(),
        vec!["edit users", "manage users", "view users"]
    );
}

#[test]
fn custom_catalog_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.json");
    fs::write(
        &catalog_path,
        r#"{
            "permissions": ["view reports", "export reports"],
            "roles": [{"name": "analyst", "grants": {"only": ["view reports"]}}]
        }"#,
    )
    .unwrap();

    let config = AdminConfig {
        seed_catalog: Some(catalog_path),
        ..config_in(&dir)
    };
    run_seed(&config).unwrap();

    let store = SnapshotFile::new(&config.store_path)
        .open_store(config.policy)
        .unwrap();
    let analyst = store.find_role_by_name("analyst").unwrap();
    assert_eq!(store.role(analyst.id).unwrap().permission_names(), vec!["view reports"]);
}

#[test]
fn seeded_store_drives_admin_and_authorization() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    run_seed(&config).unwrap();

    let file = SnapshotFile::new(&config.store_path);
    let admin = RoleAdmin::new(file.open_store(config.policy).unwrap());

    let view_orders = admin.store().find_permission_by_name("view orders").unwrap();
    admin
        .store_role(&RoleForm {
            name: "clerk".to_string(),
            permissions: vec![view_orders.id],
        })
        .unwrap();

    let clerk = admin.store().find_role_by_name("clerk").unwrap();
    let user = UserId::new();
    admin.store().assign_role(user, clerk.id).unwrap();
    file.persist(admin.store()).unwrap();

    let authz = Authorizer::new(file.open_store(config.policy).unwrap());
    assert!(authz.authorize(user, "view orders"));
    assert!(!authz.authorize(user, "delete orders"));
    assert!(authz.has_role(user, "clerk"));
    assert!(!authz.has_role(user, "admin"));
}
