use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use vigil_core::VigilConfig;
use vigil_definitions::load_dir;

use super::open_catalog;

pub async fn import(config: &VigilConfig, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = dir
        .or_else(|| config.bootstrap.as_ref().map(|b| b.data_dir.clone()))
        .context("no seed directory: pass --dir or set [bootstrap].data_dir")?;

    let catalog = open_catalog(config)?;
    let summary = load_dir(&catalog, &dir).await?;
    catalog.mark_initialized();
    info!(loaded = summary.total(), "import finished");

    println!(
        "✓ Imported {} triggers, {} conditions, {} dampenings, {} actions ({} lines skipped)",
        summary.triggers, summary.conditions, summary.dampenings, summary.actions, summary.skipped
    );
    Ok(())
}
