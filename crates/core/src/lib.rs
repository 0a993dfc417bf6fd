//! `rolegate-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::{Entity, sort_by_name};
pub use error::{DomainError, DomainResult, EntityKind};
pub use id::{PermissionId, RoleId, UserId};
pub use value_object::{MAX_NAME_LEN, ValueObject, normalize_name};
