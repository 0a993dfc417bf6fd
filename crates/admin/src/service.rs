//! Role administration facade.
//!
//! Mirrors the admin surface (index/create/store/edit/update/destroy) without
//! any transport: inputs are plain forms, outputs are views, notices, or
//! field-level errors a UI can render next to the offending input.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use rolegate_auth::{
    DomainError, EntityKind, Permission, PermissionId, RbacStore, RbacStoreExt, RoleId,
    RoleWithPermissions,
};

/// Submitted role form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleForm {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionId>,
}

/// Confirmation shown after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Data needed to render the edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleEditView {
    pub role: RoleWithPermissions,
    pub permissions: Vec<Permission>,
}

/// One message for one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl core::fmt::Display for FieldError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// A form field failed validation.
    #[error("{field}: {message}")]
    Field { field: &'static str, message: String },

    /// Several form fields failed validation, in form order.
    #[error("{}", join_fields(.0))]
    Invalid(Vec<FieldError>),

    #[error("role not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AdminError {
    /// The (first) form field this error belongs to, if any.
    pub fn field(&self) -> Option<&'static str> {
        self.field_errors().first().map(|e| e.field)
    }

    /// Every field-level message carried by this error.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            AdminError::Field { field, message } => vec![FieldError {
                field: *field,
                message: message.clone(),
            }],
            AdminError::Invalid(errors) => errors.clone(),
            _ => Vec::new(),
        }
    }
}

impl From<DomainError> for AdminError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::DuplicateName { .. } => AdminError::Field {
                field: "name",
                message: "The name has already been taken.".to_string(),
            },
            DomainError::Validation { field, message } => AdminError::Field { field, message },
            DomainError::NotFound {
                kind: EntityKind::Permission,
                ..
            } => AdminError::Field {
                field: "permissions",
                message: "The selected permissions are invalid.".to_string(),
            },
            DomainError::NotFound { .. } => AdminError::NotFound,
            DomainError::InvalidId(message) => AdminError::Field { field: "id", message },
            DomainError::Unavailable(message) => AdminError::Unavailable(message),
            DomainError::Invalid(errors) => {
                let mut fields = Vec::with_capacity(errors.len());
                for err in errors {
                    match AdminError::from(err) {
                        AdminError::Field { field, message } => fields.push(FieldError { field, message }),
                        AdminError::Invalid(more) => fields.extend(more),
                        other => return other,
                    }
                }
                AdminError::Invalid(fields)
            }
        }
    }
}

pub struct RoleAdmin<S> {
    store: S,
}

impl<S> RoleAdmin<S>
where
    S: RbacStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every role with its permissions.
    pub fn index(&self) -> Result<Vec<RoleWithPermissions>, AdminError> {
        Ok(self.store.list_roles()?)
    }

    /// Permission options for the create form.
    pub fn create_form(&self) -> Result<Vec<Permission>, AdminError> {
        Ok(self.store.list_permissions()?)
    }

    pub fn store_role(&self, form: &RoleForm) -> Result<Notice, AdminError> {
        self.store
            .create_role(&form.name, &form.permissions)
            .map_err(|e| rejected("store", e))?;
        Ok(Notice::new("Role created successfully."))
    }

    pub fn edit(&self, id: RoleId) -> Result<RoleEditView, AdminError> {
        Ok(RoleEditView {
            role: self.store.role(id)?,
            permissions: self.store.list_permissions()?,
        })
    }

    pub fn update(&self, id: RoleId, form: &RoleForm) -> Result<Notice, AdminError> {
        self.store
            .update_role(id, &form.name, &form.permissions)
            .map_err(|e| rejected("update", e))?;
        Ok(Notice::new("Role updated successfully."))
    }

    pub fn destroy(&self, id: RoleId) -> Result<Notice, AdminError> {
        self.store.delete_role(id)?;
        Ok(Notice::new("Role deleted successfully."))
    }
}

fn rejected(action: &'static str, err: DomainError) -> AdminError {
    debug!(action, error = %err, "role form rejected");
    err.into()
}

#[cfg(test)]
mod tests {
    use rolegate_auth::{InMemoryRbacStore, RolePolicy};

    use super::*;

    fn admin_with(perms: &[&str]) -> (RoleAdmin<InMemoryRbacStore>, Vec<PermissionId>) {
        let store = InMemoryRbacStore::new();
        let ids = perms
            .iter()
            .map(|p| store.create_permission(p).unwrap().id)
            .collect();
        (RoleAdmin::new(store), ids)
    }

    fn form(name: &str, permissions: &[PermissionId]) -> RoleForm {
        RoleForm {
            name: name.to_string(),
            permissions: permissions.to_vec(),
        }
    }

    #[test]
    fn store_then_index() {
        let (admin, ids) = admin_with(&["view users", "manage users"]);
        let notice = admin.store_role(&form("editor", &ids[..1])).unwrap();
        assert_eq!(notice.message, "Role created successfully.");

        let roles = admin.index().unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].permission_names(), vec!["view users"]);
    }

    #[test]
    fn duplicate_name_is_a_name_field_error() {
        let (admin, ids) = admin_with(&["view users"]);
        admin.store_role(&form("editor", &ids)).unwrap();
        let err = admin.store_role(&form("editor", &ids)).unwrap_err();
        assert_eq!(err.field(), Some("name"));
        assert_eq!(err.to_string(), "name: The name has already been taken.");
    }

    #[test]
    fn missing_permissions_is_a_permissions_field_error() {
        let (admin, _) = admin_with(&["view users"]);
        let err = admin.store_role(&form("editor", &[])).unwrap_err();
        assert_eq!(err.field(), Some("permissions"));

        let err = admin.store_role(&form("editor", &[PermissionId::new()])).unwrap_err();
        assert_eq!(err.field(), Some("permissions"));
    }

    #[test]
    fn taken_name_and_missing_permissions_are_both_reported() {
        let (admin, ids) = admin_with(&["view users"]);
        admin.store_role(&form("editor", &ids)).unwrap();

        let err = admin.store_role(&form("editor", &[])).unwrap_err();
        let fields: Vec<&str> = err.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "permissions"]);
        assert_eq!(
            err.to_string(),
            "name: The name has already been taken.; permissions: select at least one permission"
        );
        assert_eq!(admin.index().unwrap().len(), 1);
    }

    #[test]
    fn update_reports_blank_name_and_unknown_permission_together() {
        let (admin, ids) = admin_with(&["view users"]);
        admin.store_role(&form("editor", &ids)).unwrap();
        let id = admin.index().unwrap()[0].role.id;

        let err = admin.update(id, &form("  ", &[PermissionId::new()])).unwrap_err();
        let AdminError::Invalid(errors) = &err else {
            panic!("expected several field errors, got {err:?}");
        };
        assert_eq!(errors[0].field, "name");
        assert_eq!(errors[1].field, "permissions");
        assert_eq!(errors[1].message, "The selected permissions are invalid.");
    }

    #[test]
    fn update_of_missing_role_is_not_found_even_with_a_blank_form() {
        let (admin, ids) = admin_with(&["view users"]);
        let err = admin.update(RoleId::new(), &form("  ", &ids)).unwrap_err();
        assert_eq!(err, AdminError::NotFound);
        assert!(err.field_errors().is_empty());
    }

    #[test]
    fn blank_name_is_a_name_field_error() {
        let (admin, ids) = admin_with(&["view users"]);
        let err = admin.store_role(&form("   ", &ids)).unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn relaxed_policy_allows_empty_roles() {
        let admin = RoleAdmin::new(InMemoryRbacStore::with_policy(RolePolicy {
            require_permissions: false,
        }));
        admin.store_role(&form("guest", &[])).unwrap();
        assert!(admin.index().unwrap()[0].permissions.is_empty());
    }

    #[test]
    fn update_keeps_own_name_and_resyncs() {
        let (admin, ids) = admin_with(&["view users", "manage users"]);
        admin.store_role(&form("editor", &ids[..1])).unwrap();
        let id = admin.index().unwrap()[0].role.id;

        let notice = admin.update(id, &form("editor", &ids[1..])).unwrap();
        assert_eq!(notice.message, "Role updated successfully.");

        let view = admin.edit(id).unwrap();
        assert_eq!(view.role.permission_names(), vec!["manage users"]);
        assert_eq!(view.permissions.len(), 2);
    }

    #[test]
    fn missing_role_is_not_found() {
        let (admin, ids) = admin_with(&["view users"]);
        let ghost = RoleId::new();
        assert_eq!(admin.edit(ghost).unwrap_err(), AdminError::NotFound);
        assert_eq!(admin.update(ghost, &form("x", &ids)).unwrap_err(), AdminError::NotFound);
        assert_eq!(admin.destroy(ghost).unwrap_err(), AdminError::NotFound);
    }

    #[test]
    fn destroy_confirms() {
        let (admin, ids) = admin_with(&["view users"]);
        admin.store_role(&form("editor", &ids)).unwrap();
        let id = admin.index().unwrap()[0].role.id;
        assert_eq!(admin.destroy(id).unwrap().message, "Role deleted successfully.");
        assert!(admin.index().unwrap().is_empty());
        assert_eq!(admin.create_form().unwrap().len(), 1);
    }

    #[test]
    fn form_deserializes_without_permissions() {
        let form: RoleForm = serde_json::from_str(r#"{"name":"editor"}"#).unwrap();
        assert!(form.permissions.is_empty());
    }
}
