//! Argument definitions for the `aether` binary.

use aether_core::Config;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Legal, robots-aware web retrieval for LLM ingestion.
#[derive(Debug, Parser)]
#[command(name = "aether", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads the configuration file when given, defaults otherwise, and
    /// applies environment overrides either way.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one URL through the polite fetch engine.
    Fetch(FetchArgs),
    /// Crawl a site breadth-first from a start URL.
    Crawl(CrawlArgs),
    /// Resolve a query and print the normalized document.
    Search(SearchArgs),
    /// Convert a canonical document (JSON) to a TOON output format.
    Convert(ConvertArgs),
}

/// Arguments for `aether fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// URL to fetch.
    pub url: String,

    /// Print the full response as JSON instead of the body only.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `aether crawl`.
#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Start URL.
    pub url: String,

    /// Maximum link depth; negative means unlimited.
    #[arg(long, default_value_t = 1)]
    pub depth: i32,

    /// Maximum pages to visit; 0 means unlimited.
    #[arg(long, default_value_t = 0)]
    pub max_pages: usize,

    /// Follow links to other hosts as well.
    #[arg(long)]
    pub all_hosts: bool,

    /// Minimum delay between requests to one host, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,
}

/// Arguments for `aether search`.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// The query (or URL) to resolve.
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Output format for the normalized document.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Arguments for `aether convert`.
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input file holding a canonical document as JSON; `-` for stdin.
    #[arg(default_value = "-")]
    pub input: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// TOON output encodings exposed by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed TOON JSON.
    Json,
    /// Compact single-letter-field JSON.
    Lite,
    /// Binary BTON v1.
    Bton,
    /// Streaming JSONL events.
    Jsonl,
}
