//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Validated
/// names (`RoleName`, `PermissionName`) are value objects: once constructed
/// they are known to be trimmed, non-empty and within the column width.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct RoleName(String);
///
/// impl ValueObject for RoleName {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Maximum length accepted for role and permission names.
pub const MAX_NAME_LEN: usize = 255;

/// Normalise and validate a record name.
///
/// Returns the trimmed name, or a validation error on `field` when the
/// name is blank or longer than [`MAX_NAME_LEN`] characters.
pub fn normalize_name(field: &'static str, raw: &str) -> crate::DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(crate::DomainError::validation(field, "the name field is required"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(crate::DomainError::validation(
            field,
            format!("the name may not be greater than {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts() {
        assert_eq!(normalize_name("name", "  editor ").unwrap(), "editor");
    }

    #[test]
    fn rejects_blank_and_oversized() {
        assert!(normalize_name("name", "   ").is_err());
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(normalize_name("name", &long).is_err());
        let max = "x".repeat(MAX_NAME_LEN);
        assert!(normalize_name("name", &max).is_ok());
    }
}
