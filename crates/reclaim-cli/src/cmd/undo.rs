//! Undo command

use crate::ui::Output;
use anyhow::{Context, Result};
use std::path::Path;

/// Restore the most recent removal while its window is open.
pub async fn undo(config: Option<&Path>, dry_run: bool) -> Result<()> {
    let output = Output::new();
    let engine = super::engine(super::load_config(config)?)?;

    let (items, remaining) = {
        let ledger = engine.ledger();
        let ledger = ledger
            .lock()
            .map_err(|_| anyhow::anyhow!("Undo ledger lock poisoned"))?;
        (ledger.items().to_vec(), ledger.remaining_seconds())
    };

    if items.is_empty() {
        output.success("Nothing to undo.");
        return Ok(());
    }

    output.section(&format!(
        "Restoring {} item(s) ({}m {}s left)",
        items.len(),
        remaining / 60,
        remaining % 60
    ));
    for item in &items {
        output.info(&item.original_path.display().to_string());
    }
    if dry_run {
        return Ok(());
    }

    let restored = engine.undo().await.context("Undo failed")?;
    if restored == items.len() {
        output.success(&format!("Restored {restored} item(s)."));
    } else {
        output.warning(&format!(
            "Restored {restored} of {} item(s) (set RUST_LOG=warn for details).",
            items.len()
        ));
    }
    Ok(())
}
