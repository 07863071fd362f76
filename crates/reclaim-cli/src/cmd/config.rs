//! Config command

use anyhow::{Context, Result};
use std::path::Path;

/// Print the effective configuration as TOML.
pub fn show(config: Option<&Path>) -> Result<()> {
    let source = config
        .map(Path::to_path_buf)
        .or_else(crate::config_path)
        .filter(|p| p.exists())
        .map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
    let config = super::load_config(config)?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
    println!("# {source}");
    print!("{rendered}");
    Ok(())
}
