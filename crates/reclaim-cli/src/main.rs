//! reclaim - reversible disk cleanup CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reclaim_cli::cmd;
use reclaim_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Clean { target } => cmd::clean::clean(config, target.into(), dry_run).await,
        Commands::Uninstall { name, bundle_id } => {
            cmd::uninstall::uninstall(config, &name, bundle_id, dry_run).await
        }
        Commands::Dupes { roots, trash } => cmd::dupes::dupes(config, roots, trash, dry_run).await,
        Commands::Big {
            scopes,
            min_mb,
            gentle,
            trash,
        } => {
            let args = cmd::big::BigArgs {
                min_mb,
                gentle,
                trash,
                dry_run,
            };
            cmd::big::big(config, scopes, args).await
        }
        Commands::Undo => cmd::undo::undo(config, dry_run).await,
        Commands::Config => cmd::config::show(config),
    }
}
