//! One-shot seeding against the configured snapshot file.

use anyhow::Context;
use tracing::info;

use rolegate_auth::{SeedReport, seed};

use crate::{AdminConfig, SnapshotFile};

/// Load the store, apply the seed catalog, and write the store back.
///
/// Running it again against the same file changes nothing.
pub fn run_seed(config: &AdminConfig) -> anyhow::Result<SeedReport> {
    let catalog = config.load_catalog()?;
    let file = SnapshotFile::new(&config.store_path);
    let store = file.open_store(config.policy)?;

    let report = seed(&store, &catalog).context("applying seed catalog")?;
    file.persist(&store)?;

    info!(
        path = %file.path().display(),
        permissions_created = report.permissions_created,
        roles_created = report.roles_created,
        "seed complete"
    );
    Ok(report)
}
