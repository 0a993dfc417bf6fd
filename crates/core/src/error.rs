//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// The kind of record an error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Permission,
    Role,
    User,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Permission => "permission",
            EntityKind::Role => "role",
            EntityKind::User => "user",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
///
/// Every variant is recoverable: callers at the admin boundary turn these
/// into field-level messages. Authorization checks never produce them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required field was missing or malformed.
    #[error("validation failed on '{field}': {message}")]
    Validation { field: &'static str, message: String },

    /// A role or permission name is already used by another record.
    #[error("{kind} name '{name}' is already taken")]
    DuplicateName { kind: EntityKind, name: String },

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Several inputs were rejected at once (one entry per failing field).
    #[error("{}", join_messages(.0))]
    Invalid(Vec<DomainError>),
}

fn join_messages(errors: &[DomainError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl DomainError {
    pub fn validation(field: &'static str, msg: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: msg.into(),
        }
    }

    pub fn duplicate_name(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Combine collected input errors: a single error is returned as is,
    /// several are wrapped in [`DomainError::Invalid`].
    pub fn from_errors(mut errors: Vec<DomainError>) -> Self {
        if errors.len() == 1 {
            if let Some(err) = errors.pop() {
                return err;
            }
        }
        Self::Invalid(errors)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The individual errors this error stands for.
    pub fn errors(&self) -> &[DomainError] {
        match self {
            Self::Invalid(errors) => errors,
            other => core::slice::from_ref(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_record() {
        let err = DomainError::duplicate_name(EntityKind::Role, "editor");
        assert_eq!(err.to_string(), "role name 'editor' is already taken");

        let err = DomainError::not_found(EntityKind::Permission, "abc");
        assert_eq!(err.to_string(), "permission not found: abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn validation_carries_field() {
        let err = DomainError::validation("permissions", "select at least one permission");
        let DomainError::Validation { field, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(field, "permissions");
    }

    #[test]
    fn single_collected_error_is_not_wrapped() {
        let err = DomainError::from_errors(vec![DomainError::duplicate_name(EntityKind::Role, "editor")]);
        assert!(matches!(err, DomainError::DuplicateName { .. }));
        assert_eq!(err.errors().len(), 1);
    }

    #[test]
    fn several_collected_errors_are_reported_together() {
        let err = DomainError::from_errors(vec![
            DomainError::duplicate_name(EntityKind::Role, "editor"),
            DomainError::validation("permissions", "select at least one permission"),
        ]);
        assert_eq!(err.errors().len(), 2);
        assert_eq!(
            err.to_string(),
            "role name 'editor' is already taken; validation failed on 'permissions': select at least one permission"
        );
    }
}
