//! Environment-driven configuration for the admin tooling.

use std::path::PathBuf;

use anyhow::Context;
use thiserror::Error;

use rolegate_auth::{RolePolicy, SeedCatalog};
use rolegate_observability::LogFormat;

pub const STORE_PATH_VAR: &str = "ROLEGATE_STORE_PATH";
pub const SEED_CATALOG_VAR: &str = "ROLEGATE_SEED_CATALOG";
pub const ALLOW_EMPTY_ROLES_VAR: &str = "ROLEGATE_ALLOW_EMPTY_ROLES";
pub const LOG_FORMAT_VAR: &str = "ROLEGATE_LOG_FORMAT";

const DEFAULT_STORE_PATH: &str = "rolegate.json";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    /// JSON snapshot file backing the store.
    pub store_path: PathBuf,
    /// Optional JSON seed catalog; the built-in catalog is used when absent.
    pub seed_catalog: Option<PathBuf>,
    pub policy: RolePolicy,
    pub log_format: LogFormat,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            seed_catalog: None,
            policy: RolePolicy::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl AdminConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty(STORE_PATH_VAR) {
            config.store_path = PathBuf::from(path);
        }
        config.seed_catalog = non_empty(SEED_CATALOG_VAR).map(PathBuf::from);

        if let Some(raw) = non_empty(ALLOW_EMPTY_ROLES_VAR) {
            let allow = parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: ALLOW_EMPTY_ROLES_VAR,
                message: format!("expected true/false, got '{raw}'"),
            })?;
            config.policy.require_permissions = !allow;
        }

        if let Some(raw) = non_empty(LOG_FORMAT_VAR) {
            config.log_format = raw.parse().map_err(|e: rolegate_observability::ParseLogFormatError| {
                ConfigError::Invalid {
                    var: LOG_FORMAT_VAR,
                    message: e.to_string(),
                }
            })?;
        }

        Ok(config)
    }

    /// Load the configured seed catalog, or the built-in one.
    pub fn load_catalog(&self) -> anyhow::Result<SeedCatalog> {
        let Some(path) = &self.seed_catalog else {
            return Ok(SeedCatalog::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed catalog {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing seed catalog {}", path.display()))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
