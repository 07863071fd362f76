//! Engine errors.
//!
//! Ordinary filesystem trouble on individual items never shows up here; it is
//! counted in an [`OperationResult`](reclaim_schema::OperationResult) instead.
//! These variants cover contract violations and infrastructure faults.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Undo journal is unreadable: {0}")]
    Journal(#[from] serde_json::Error),

    #[error("Undo ledger lock poisoned")]
    LedgerPoisoned,

    #[error(transparent)]
    Preview(#[from] reclaim_schema::PreviewError),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Could not determine home directory. Set RECLAIM_HOME to override.")]
    NoHome,
}

impl EngineError {
    /// Shorthand for a configuration contract violation.
    pub fn invalid(msg: impl std::fmt::Display) -> Self {
        Self::InvalidConfig(msg.to_string())
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
