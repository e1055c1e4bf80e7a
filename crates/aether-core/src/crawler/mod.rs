//! Depth-limited, politeness-aware crawl orchestration.
//!
//! The crawl is single-worker and strictly FIFO over the frontier; the
//! frontier and visited set are already concurrency-safe so workers can be
//! added later without contract changes. Any fetch or visitor error aborts
//! the whole run.

mod frontier;

pub use frontier::{Frontier, FrontierItem, Visited, canonicalize};

use crate::detect::{ContentType, detect};
use crate::fetcher::Fetcher;
use crate::limiter::HostPacer;
use crate::types::Page;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Callback capability invoked once per crawled page.
#[async_trait]
pub trait PageVisitor: Send + Sync {
    /// Handles one page. Returning an error aborts the crawl.
    async fn visit_page(&self, ctx: &CancellationToken, page: &Page) -> Result<()>;
}

/// Crawl tuning knobs.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum link depth from the root; negative means unlimited.
    pub max_depth: i32,
    /// Maximum number of pages to visit; zero means unlimited.
    pub max_pages: usize,
    /// Restrict the crawl to the start URL's host.
    pub same_host_only: bool,
    /// When non-empty, only these domains (and their subdomains) are
    /// crawled.
    pub allowed_domains: Vec<String>,
    /// Domains (and their subdomains) never crawled.
    pub disallowed_domains: Vec<String>,
    /// Minimum delay between fetches to the same host.
    pub fetch_delay: Duration,
    /// Worker count the shared structures are sized for. The current
    /// orchestrator runs a single worker.
    pub concurrency: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 0,
            same_host_only: true,
            allowed_domains: Vec::new(),
            disallowed_domains: Vec::new(),
            fetch_delay: Duration::ZERO,
            concurrency: 1,
        }
    }
}

/// Single-worker crawl orchestrator over the fetch engine.
pub struct Crawler {
    fetcher: Arc<Fetcher>,
    config: CrawlConfig,
    visitor: Arc<dyn PageVisitor>,
}

impl Crawler {
    /// Creates a crawler delivering pages to `visitor`.
    #[must_use]
    pub fn new(fetcher: Arc<Fetcher>, config: CrawlConfig, visitor: Arc<dyn PageVisitor>) -> Self {
        Self {
            fetcher,
            config,
            visitor,
        }
    }

    /// Runs a crawl from `start_url`. Returns the number of pages visited.
    pub async fn run(&self, ctx: &CancellationToken, start_url: &str) -> Result<usize> {
        let start = canonicalize(start_url, None)
            .ok_or_else(|| Error::http(format!("invalid crawl start url: {start_url}")))?;
        let start_host = start
            .host_str()
            .ok_or_else(|| Error::http(format!("crawl start url has no host: {start_url}")))?
            .to_string();

        if !self.host_allowed(&start_host, &start_host) {
            return Err(Error::Config(format!(
                "crawl start host {start_host} is excluded by domain rules"
            )));
        }

        let frontier = Frontier::new();
        let visited = Visited::new();
        let pacer = HostPacer::new(self.config.fetch_delay);

        frontier.enqueue(start.as_str(), 0);
        visited.mark(start.as_str());

        let mut pages_visited = 0usize;

        loop {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let Some(item) = frontier.dequeue() else {
                info!(pages = pages_visited, "crawl frontier exhausted");
                return Ok(pages_visited);
            };

            if !self.depth_allowed(item.depth) {
                debug!(url = %item.url, depth = item.depth, "skipping, beyond depth limit");
                continue;
            }
            let Some(url) = canonicalize(&item.url, None) else {
                continue;
            };
            let Some(host) = url.host_str().map(str::to_string) else {
                continue;
            };
            if !self.host_allowed(&host, &start_host) {
                debug!(url = %url, "skipping, host excluded");
                continue;
            }
            if self.config.max_pages > 0 && pages_visited >= self.config.max_pages {
                info!(pages = pages_visited, "crawl page limit reached");
                return Ok(pages_visited);
            }

            pacer.wait(&host).await;

            // Any fetch error, robots denial included, is fatal to the run.
            let response = self.fetcher.fetch(ctx, url.as_str(), None).await?;

            let detection = detect(&response.headers, &response.body);
            let body_text = response.body_text();

            let mut metadata = std::collections::BTreeMap::new();
            metadata.insert("content_type".to_string(), detection.raw_type.to_string());
            if !detection.mime.is_empty() {
                metadata.insert("mime".to_string(), detection.mime.clone());
            }

            if detection.raw_type == ContentType::Html {
                for (key, value) in crate::detect::extract_page_meta(&body_text) {
                    if key == "title" || key == "description" {
                        metadata.entry(key).or_insert(value);
                    }
                }
                self.expand_links(&body_text, &url, &item, &frontier, &visited, &start_host);
            }

            let page = Page {
                url: url.to_string(),
                depth: item.depth,
                status: response.status_code,
                content: body_text,
                metadata,
            };

            self.visitor.visit_page(ctx, &page).await?;
            pages_visited += 1;
        }
    }

    /// Resolves, filters, and enqueues the page's outbound links.
    fn expand_links(
        &self,
        body: &str,
        base: &Url,
        item: &FrontierItem,
        frontier: &Frontier,
        visited: &Visited,
        start_host: &str,
    ) {
        for href in crate::html::extract_hrefs(body) {
            let Some(link) = canonicalize(&href, Some(base)) else {
                continue;
            };
            let Some(host) = link.host_str() else {
                continue;
            };
            if !self.host_allowed(host, start_host) {
                continue;
            }
            if visited.mark(link.as_str()) {
                frontier.enqueue(link.as_str(), item.depth + 1);
            }
        }
    }

    fn depth_allowed(&self, depth: usize) -> bool {
        if self.config.max_depth < 0 {
            return true;
        }
        depth <= self.config.max_depth.unsigned_abs() as usize
    }

    fn host_allowed(&self, host: &str, start_host: &str) -> bool {
        if self.config.same_host_only && host != start_host {
            return false;
        }
        if self
            .config
            .disallowed_domains
            .iter()
            .any(|domain| domain_matches(host, domain))
        {
            return false;
        }
        if !self.config.allowed_domains.is_empty()
            && !self
                .config
                .allowed_domains
                .iter()
                .any(|domain| domain_matches(host, domain))
        {
            return false;
        }
        true
    }
}

/// True when `host` is `domain` or a subdomain of it.
fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.trim().to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}
