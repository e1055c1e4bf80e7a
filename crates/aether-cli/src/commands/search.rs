//! `aether search`: resolve a query and print the normalized document.

use crate::cli::SearchArgs;
use aether_core::toon::ToonDocument;
use aether_core::{Config, Fetcher, PluginRegistry, SearchPipeline, normalize};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(config: Config, args: SearchArgs) -> Result<()> {
    let query = args.query.join(" ");
    let fetcher = Arc::new(Fetcher::new(config).context("building fetch engine")?);
    let pipeline = SearchPipeline::new(fetcher, Arc::new(PluginRegistry::new()), None);

    let ctx = CancellationToken::new();
    let result = pipeline
        .search(&ctx, &query)
        .await
        .with_context(|| format!("searching for {query:?}"))?;

    let document = normalize::pipeline(&result);
    let toon = ToonDocument::from_document(&document).context("building toon document")?;
    super::convert::emit(&ctx, &toon, args.format)
}
