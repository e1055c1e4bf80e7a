//! `aether fetch`: one URL through the polite fetch engine.

use crate::cli::FetchArgs;
use aether_core::{Config, Fetcher};
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

pub async fn run(config: Config, args: FetchArgs) -> Result<()> {
    let fetcher = Fetcher::new(config).context("building fetch engine")?;
    let ctx = CancellationToken::new();

    let response = fetcher
        .fetch(&ctx, &args.url, None)
        .await
        .with_context(|| format!("fetching {}", args.url))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        tracing::info!(status = response.status_code, bytes = response.body.len(), "fetched");
        print!("{}", response.body_text());
    }
    Ok(())
}
