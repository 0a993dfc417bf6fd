//! `rolegate-admin` — admin facade, configuration and snapshot tooling.

pub mod bootstrap;
pub mod config;
pub mod persistence;
pub mod service;

pub use bootstrap::run_seed;
pub use config::{AdminConfig, ConfigError};
pub use persistence::SnapshotFile;
pub use service::{AdminError, FieldError, Notice, RoleAdmin, RoleEditView, RoleForm};
