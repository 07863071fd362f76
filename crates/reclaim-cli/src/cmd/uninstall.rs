//! Uninstall command

use crate::ui::{Output, format_size};
use anyhow::{Context, Result};
use reclaim_core::{AppTarget, Operation};
use std::path::Path;

/// Trash an application bundle and its remnants.
pub async fn uninstall(
    config: Option<&Path>,
    name: &str,
    bundle_id: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let output = Output::new();
    let app = AppTarget::new(name, bundle_id).context("Invalid application")?;
    let engine = super::engine(super::load_config(config)?)?;

    output.section(&format!("Uninstalling {app}"));

    if dry_run {
        let tree = engine.plan(Operation::Uninstall(app)).await?;
        let paths = tree.selected_leaf_paths();
        if paths.is_empty() {
            output.success("Nothing found.");
            return Ok(());
        }
        output.preview(&tree);
        let total = tree
            .roots()
            .iter()
            .filter_map(|id| tree.total_size(*id).ok())
            .sum::<u64>();
        output.success(&format!(
            "Would move {} item(s), freeing {}.",
            paths.len(),
            format_size(total)
        ));
        return Ok(());
    }

    let result = engine.uninstall(app).await?;
    output.result(&result);
    Ok(())
}
