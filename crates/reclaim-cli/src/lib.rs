//! reclaim - reversible disk cleanup
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Command-line front end for `reclaim-core`.
//!
//! # Overview
//!
//! Every command loads one configuration snapshot, builds an engine for the
//! current user and hands it a single operation. Removals go to the trash
//! and the latest batch can be put back with `reclaim undo` until its window
//! closes.

pub mod cmd;
pub mod ui;

pub use reclaim_core::paths::*;

use clap::{Parser, Subcommand, ValueEnum};
use reclaim_core::CleanupKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "reclaim")]
#[command(author, version, about = "reclaim - reversible disk cleanup")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Configuration file (defaults to $RECLAIM_HOME/config.toml)
    #[arg(long, global = true, env = "RECLAIM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Move old caches, logs or browser data to the trash
    Clean {
        /// What to clean
        target: CleanTarget,
    },
    /// Remove an application and its leftovers
    Uninstall {
        /// Application name, with or without `.app`
        name: String,
        /// Bundle identifier, e.g. com.example.App
        #[arg(long)]
        bundle_id: Option<String>,
    },
    /// Find files with identical content
    Dupes {
        /// Directories to search
        #[arg(required = true)]
        roots: Vec<PathBuf>,
        /// Trash every copy but the first in each group
        #[arg(long)]
        trash: bool,
    },
    /// Find oversized files
    Big {
        /// Directories to scan
        #[arg(required = true)]
        scopes: Vec<PathBuf>,
        /// Minimum size in MiB (overrides the configured threshold)
        #[arg(long, allow_negative_numbers = true)]
        min_mb: Option<i64>,
        /// Throttle the scan to keep the system responsive
        #[arg(long)]
        gentle: bool,
        /// Move every file found to the trash
        #[arg(long)]
        trash: bool,
    },
    /// Restore the most recent removal
    Undo,
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CleanTarget {
    Caches,
    Logs,
    Browser,
}

impl From<CleanTarget> for CleanupKind {
    fn from(target: CleanTarget) -> Self {
        match target {
            CleanTarget::Caches => Self::Caches,
            CleanTarget::Logs => Self::Logs,
            CleanTarget::Browser => Self::BrowserData,
        }
    }
}
