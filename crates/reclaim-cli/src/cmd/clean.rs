//! Clean command (caches, logs, browser data)

use crate::ui::{Output, format_size};
use anyhow::Result;
use reclaim_core::{CleanupKind, Operation};
use std::path::Path;

/// Sweep one family of well-known locations.
pub async fn clean(config: Option<&Path>, kind: CleanupKind, dry_run: bool) -> Result<()> {
    let output = Output::new();
    let config = super::load_config(config)?;
    let keep_days = config.keep_days();
    let engine = super::engine(config)?;
    let op = Operation::Clean(kind);

    if keep_days > 0 {
        output.section(&format!("Cleaning {kind} older than {keep_days} day(s)"));
    } else {
        output.section(&format!("Cleaning {kind}"));
    }

    if dry_run {
        let tree = engine.plan(op).await?;
        output.preview(&tree);
        let total = tree
            .roots()
            .iter()
            .filter_map(|id| tree.total_size(*id).ok())
            .sum::<u64>();
        output.success(&format!(
            "Would move {} item(s), freeing {}.",
            tree.selected_leaf_paths().len(),
            format_size(total)
        ));
        return Ok(());
    }

    let result = engine.run(op).await?;
    output.result(&result);
    Ok(())
}
