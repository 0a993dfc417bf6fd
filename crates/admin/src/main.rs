use anyhow::Context;

use rolegate_admin::{AdminConfig, run_seed};

fn main() -> anyhow::Result<()> {
    let config = AdminConfig::from_env().context("loading configuration")?;
    rolegate_observability::init(config.log_format);

    tracing::info!(path = %config.store_path.display(), "seeding rbac store");
    let report = run_seed(&config)?;

    for role in &report.roles {
        tracing::info!(
            role = %role.name,
            permissions = role.permissions,
            attached = role.attached,
            detached = role.detached,
            "role synced"
        );
    }
    Ok(())
}
