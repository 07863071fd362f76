//! Big command (oversized file finder)

use crate::ui::{Output, format_size};
use anyhow::Result;
use futures::StreamExt;
use reclaim_schema::OperationKind;
use std::path::{Path, PathBuf};

/// Options for one `reclaim big` run.
#[derive(Debug, Clone, Copy)]
pub struct BigArgs {
    pub min_mb: Option<i64>,
    pub gentle: bool,
    pub trash: bool,
    pub dry_run: bool,
}

/// Stream oversized files as the scan finds them, optionally trashing them.
pub async fn big(config: Option<&Path>, scopes: Vec<PathBuf>, args: BigArgs) -> Result<()> {
    let output = Output::new();
    let mut config = super::load_config(config)?;
    if let Some(mb) = args.min_mb {
        config.scan.min_big_file_mb = mb;
    }
    let threshold = config.min_big_file_bytes();
    let engine = super::engine(config)?;
    let cancel = super::cancel_on_interrupt();

    output.section(&format!("Files of {} or more", format_size(threshold)));
    let mut batches = engine
        .find_big_files(scopes, args.gentle, cancel.clone())?
        .into_stream();

    let mut found = Vec::new();
    let mut total = 0u64;
    while let Some(batch) = batches.next().await {
        for record in batch {
            let label = if record.is_package {
                format!("{} (package)", record.path.display())
            } else {
                record.path.display().to_string()
            };
            output.row(record.size, &label);
            total = total.saturating_add(record.size);
            found.push(record.path);
        }
    }

    if cancel.is_cancelled() {
        output.warning(&format!("Scan cancelled after {} file(s).", found.len()));
        return Ok(());
    }
    output.success(&format!("{} file(s), {} in total.", found.len(), format_size(total)));

    if !args.trash || found.is_empty() {
        return Ok(());
    }
    if args.dry_run {
        output.info(&format!("Would move {} item(s) to the trash.", found.len()));
        return Ok(());
    }
    let result = engine
        .trash_paths(found, OperationKind::LargeFiles, None)
        .await?;
    output.result(&result);
    Ok(())
}
