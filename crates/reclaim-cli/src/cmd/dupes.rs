//! Dupes command (duplicate content finder)

use crate::ui::{Output, format_size};
use anyhow::Result;
use reclaim_schema::{DuplicateGroup, OperationKind};
use std::path::{Path, PathBuf};

/// List duplicate groups, optionally trashing the redundant copies.
pub async fn dupes(config: Option<&Path>, roots: Vec<PathBuf>, trash: bool, dry_run: bool) -> Result<()> {
    let output = Output::new();
    let engine = super::engine(super::load_config(config)?)?;
    let cancel = super::cancel_on_interrupt();

    output.section("Searching for duplicates");
    let groups = engine.find_duplicates(roots, cancel.clone()).await?;
    if cancel.is_cancelled() {
        output.warning("Scan cancelled.");
        return Ok(());
    }
    if groups.is_empty() {
        output.success("No duplicates found.");
        return Ok(());
    }

    for group in &groups {
        println!();
        output.row(
            group.reclaimable_bytes(),
            &format!("{} copies of {}", group.files.len(), format_size(group.size_per_file)),
        );
        for (i, file) in group.files.iter().enumerate() {
            let marker = if i == 0 { "keep " } else { "extra" };
            output.info(&format!("  {marker} {}", file.display()));
        }
    }

    let redundant: Vec<PathBuf> = groups
        .iter()
        .flat_map(|g| g.redundant().iter().cloned())
        .collect();
    let reclaimable: u64 = groups.iter().map(DuplicateGroup::reclaimable_bytes).sum();
    println!();

    if !trash || dry_run {
        output.success(&format!(
            "{} group(s), {} redundant file(s), {} reclaimable.",
            groups.len(),
            redundant.len(),
            format_size(reclaimable)
        ));
        if !trash {
            output.info("Pass --trash to move the extra copies to the trash.");
        }
        return Ok(());
    }

    let result = engine
        .trash_paths(redundant, OperationKind::Duplicates, None)
        .await?;
    output.result(&result);
    Ok(())
}
