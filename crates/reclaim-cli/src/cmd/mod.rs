//! Command modules - one file per CLI command

pub mod big;
pub mod clean;
pub mod config;
pub mod dupes;
pub mod undo;
pub mod uninstall;

use anyhow::{Context, Result};
use reclaim_core::{Engine, EngineConfig, LogSink};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Load the configuration snapshot for this invocation.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => EngineConfig::load().context("Failed to load config"),
    }
}

/// Engine for the current user, reporting events to the log.
pub fn engine(config: EngineConfig) -> Result<Engine> {
    Ok(Engine::for_user(config)
        .context("Failed to initialise cleanup engine")?
        .with_events(Arc::new(LogSink)))
}

/// A token that fires on Ctrl-C.
pub fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling scan");
            trigger.cancel();
        }
    });
    cancel
}
