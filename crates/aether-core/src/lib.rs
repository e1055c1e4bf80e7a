//! # aether-core
//!
//! A robots-aware web retrieval and normalization toolkit. Public web
//! content (HTML pages, articles, RSS/Atom feeds, JSON APIs) goes in; one
//! canonical document shape comes out, ready for LLM/RAG ingestion through
//! the TOON serializers.
//!
//! ## Architecture
//!
//! The crate is organized as a pipeline of small components:
//!
//! - **Fetching**: [`Fetcher`] layers robots compliance, per-host
//!   concurrency and pacing, a read-through cache, and bounded retries
//!   over a shared HTTP client.
//! - **Crawling**: [`Crawler`] composes the fetcher with a FIFO frontier
//!   and visited set for depth-limited traversal.
//! - **Understanding**: content detection, structural HTML extraction,
//!   readability-style article extraction, and feed parsing.
//! - **Normalization**: deterministic merging of partial documents into
//!   the canonical [`Document`].
//! - **Serialization**: the TOON token stream with JSON, compact "Lite"
//!   JSON, binary BTON, and streaming JSONL encodings.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use aether_core::{Config, Fetcher};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> aether_core::Result<()> {
//! let fetcher = Fetcher::new(Config::default())?;
//! let ctx = CancellationToken::new();
//! let response = fetcher.fetch(&ctx, "https://example.com/", None).await?;
//! println!("{} bytes", response.body.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! Every fallible operation returns [`Result<T, Error>`] with a stable
//! kind tag (`config`, `http`, `robots`, `parsing`, `cancelled`,
//! `unknown`). Auxiliary subsystems (cache tiers, robots fetches) are
//! fail-open and never surface errors to callers.

/// Readability-style article extraction
pub mod article;
/// Layered read-through cache (memory, file, remote tiers)
pub mod cache;
/// Configuration options and defaults
pub mod config;
/// Depth-limited crawl orchestration
pub mod crawler;
/// Content-type detection and page metadata extraction
pub mod detect;
/// Error types and result aliases
pub mod error;
/// RSS/Atom feed parsing and normalization
pub mod feed;
/// The polite fetch engine and plugin fetch surface
pub mod fetcher;
/// Structural HTML parsing and extractors
pub mod html;
/// Host concurrency gate and per-host pacer
pub mod limiter;
/// Canonical document normalization
pub mod normalize;
/// Query classification and route planning
pub mod query;
/// Plugin roles and the name-unique registry
pub mod registry;
/// robots.txt parsing and the per-host policy cache
pub mod robots;
/// The search pipeline
pub mod search;
/// TOON serialization (JSON, Lite, BTON, streaming)
pub mod toon;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use article::Article;
pub use cache::LayeredCache;
pub use config::Config;
pub use crawler::{CrawlConfig, Crawler, PageVisitor};
pub use detect::{ContentType, Detection, detect};
pub use error::{Error, Result};
pub use feed::{Feed, FeedItem};
pub use fetcher::{BatchItem, BatchOptions, Fetcher};
pub use html::HtmlDocument;
pub use query::{Classification, Intent, RoutePlan, build_route, classify};
pub use registry::{DisplayPlugin, PluginRegistry, SourcePlugin, TransformPlugin};
pub use robots::{RobotsCache, RobotsRules};
pub use search::{LookupProvider, LookupResult, SearchPipeline, SearchResult};
pub use toon::{ToonBuilder, ToonDocument};
pub use types::{DocKind, Document, Entity, FetchResponse, Page, SearchDocument, Section, SectionRole};
