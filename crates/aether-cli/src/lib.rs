//! Thin command-line shell over aether-core.
//!
//! No retrieval logic lives here: each subcommand builds a core
//! component, runs it, and prints the result.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Parses arguments, initializes logging, and dispatches a subcommand.
pub async fn run() -> Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.load_config()?;

    match args.command {
        cli::Command::Fetch(fetch_args) => commands::fetch::run(config, fetch_args).await,
        cli::Command::Crawl(crawl_args) => commands::crawl::run(config, crawl_args).await,
        cli::Command::Search(search_args) => commands::search::run(config, search_args).await,
        cli::Command::Convert(convert_args) => commands::convert::run(&convert_args),
    }
}
