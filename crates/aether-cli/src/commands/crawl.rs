//! `aether crawl`: breadth-first site traversal, one JSON line per page.

use crate::cli::CrawlArgs;
use aether_core::{Config, CrawlConfig, Crawler, Fetcher, Page, PageVisitor, Result as CoreResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Writes each visited page as a JSON line on stdout.
struct JsonlVisitor;

#[async_trait]
impl PageVisitor for JsonlVisitor {
    async fn visit_page(&self, _ctx: &CancellationToken, page: &Page) -> CoreResult<()> {
        // Keep the emitted record small: drop the body, keep the shape.
        let record = serde_json::json!({
            "url": page.url,
            "depth": page.depth,
            "status": page.status,
            "bytes": page.content.len(),
            "metadata": page.metadata,
        });
        println!("{record}");
        Ok(())
    }
}

pub async fn run(config: Config, args: CrawlArgs) -> Result<()> {
    let fetcher = Arc::new(Fetcher::new(config).context("building fetch engine")?);
    let crawl_config = CrawlConfig {
        max_depth: args.depth,
        max_pages: args.max_pages,
        same_host_only: !args.all_hosts,
        fetch_delay: Duration::from_millis(args.delay_ms),
        ..CrawlConfig::default()
    };
    let crawler = Crawler::new(fetcher, crawl_config, Arc::new(JsonlVisitor));

    let ctx = CancellationToken::new();
    let pages = crawler
        .run(&ctx, &args.url)
        .await
        .with_context(|| format!("crawling {}", args.url))?;
    tracing::info!(pages, "crawl finished");
    Ok(())
}
