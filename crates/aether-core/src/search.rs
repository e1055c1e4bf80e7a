//! The search pipeline: URL dispatch, plugin iteration, lookup fallback.
//!
//! A query either is a URL (fetched directly and classified), or it is
//! offered to the registered source plugins in stable order, falling back
//! to the injected lookup collaborator. Plugin failures skip to the next
//! plugin; only an unusable query is an error.

use crate::article::{self, Article};
use crate::detect::{ContentType, detect};
use crate::feed::{self, Feed};
use crate::fetcher::Fetcher;
use crate::query::{Intent, classify};
use crate::registry::PluginRegistry;
use crate::types::{Entity, META_SOURCE_PLUGIN, SearchDocument, collapse_whitespace};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Maximum characters of body text kept as the primary excerpt.
const PRIMARY_EXCERPT_MAX: usize = 320;

/// How a search was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanInfo {
    /// The query as received.
    pub raw_query: String,
    /// Classified intent.
    pub intent: Intent,
    /// The URL dispatched, for URL queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// The lookup source that answered, when the fallback was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Everything one search produced, pre-normalization.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// The query as received.
    pub query: String,
    /// Resolution plan.
    pub plan: PlanInfo,
    /// Primary document, when any path produced one.
    pub primary: Option<SearchDocument>,
    /// Extracted article, for HTML URL dispatches.
    pub article: Option<Article>,
    /// Parsed feed, for feed URL dispatches.
    pub feed: Option<Feed>,
    /// Structured entities from the lookup collaborator.
    pub entities: Vec<Entity>,
}

/// Result of one lookup-collaborator call.
#[derive(Debug, Clone, Default)]
pub struct LookupResult {
    /// Structured summary document, when found.
    pub document: Option<SearchDocument>,
    /// Entities related to the query.
    pub entities: Vec<Entity>,
}

/// The structured-summary fallback source (an encyclopedia-style API in
/// production; injected so the pipeline stays free of concrete
/// integrations).
#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Identifier recorded as `plan.source` when this provider answers.
    fn name(&self) -> &str;

    /// Attempts a structured lookup for the query.
    async fn lookup(
        &self,
        ctx: &CancellationToken,
        fetcher: &Fetcher,
        query: &str,
    ) -> Result<LookupResult>;
}

/// Query-to-documents pipeline over the fetch engine and plugin registry.
pub struct SearchPipeline {
    fetcher: Arc<Fetcher>,
    registry: Arc<PluginRegistry>,
    lookup: Option<Arc<dyn LookupProvider>>,
}

impl SearchPipeline {
    /// Creates a pipeline. `lookup` may be absent, in which case the
    /// fallback step is skipped.
    #[must_use]
    pub fn new(
        fetcher: Arc<Fetcher>,
        registry: Arc<PluginRegistry>,
        lookup: Option<Arc<dyn LookupProvider>>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            lookup,
        }
    }

    /// The underlying fetch engine, for callers composing further stages.
    #[must_use]
    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    /// Resolves a query into a [`SearchResult`].
    pub async fn search(&self, ctx: &CancellationToken, query: &str) -> Result<SearchResult> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(Error::Unknown("search query is empty".into()));
        }

        let classification = classify(trimmed);
        let mut result = SearchResult {
            query: trimmed.to_string(),
            plan: PlanInfo {
                raw_query: trimmed.to_string(),
                intent: classification.intent,
                url: None,
                source: None,
            },
            ..SearchResult::default()
        };

        if let Some(url) = url_probable(trimmed) {
            info!(url = %url, "dispatching query as direct fetch");
            result.plan.url = Some(url.to_string());
            self.dispatch_url(ctx, &url, &mut result).await?;
            return Ok(result);
        }

        for plugin in self.registry.sources() {
            match plugin.fetch(ctx, &self.fetcher, trimmed).await {
                Ok(Some(mut doc)) => {
                    doc.metadata
                        .insert(META_SOURCE_PLUGIN.to_string(), plugin.name().to_string());
                    debug!(plugin = plugin.name(), "source plugin answered");
                    result.primary = Some(doc);
                    return Ok(result);
                },
                Ok(None) => {},
                Err(e) => {
                    debug!(plugin = plugin.name(), error = %e, "source plugin failed, skipping");
                },
            }
        }

        if let Some(lookup) = &self.lookup {
            let outcome = lookup.lookup(ctx, &self.fetcher, trimmed).await?;
            result.plan.source = Some(lookup.name().to_string());
            result.primary = outcome.document;
            result.entities = outcome.entities;
        }

        Ok(result)
    }

    async fn dispatch_url(
        &self,
        ctx: &CancellationToken,
        url: &Url,
        result: &mut SearchResult,
    ) -> Result<()> {
        let response = self.fetcher.fetch(ctx, url.as_str(), None).await?;
        let detection = detect(&response.headers, &response.body);
        let body_text = response.body_text();

        let mut metadata = std::collections::BTreeMap::new();
        let content_type = if detection.mime.is_empty() {
            detection.raw_type.to_string()
        } else {
            detection.mime.clone()
        };
        metadata.insert("content_type".to_string(), content_type);
        metadata.insert("source".to_string(), "direct_fetch".to_string());

        let collapsed = collapse_whitespace(&body_text);
        let excerpt: String = collapsed.chars().take(PRIMARY_EXCERPT_MAX).collect();

        result.primary = Some(SearchDocument {
            url: url.to_string(),
            kind: detection.raw_type.to_string(),
            title: String::new(),
            excerpt,
            content: body_text.clone(),
            metadata,
        });

        match detection.raw_type {
            ContentType::Html => {
                result.article = Some(article::extract(&body_text));
            },
            ContentType::Rss | ContentType::Xml => {
                // XML may still be a feed; a sniff failure just leaves the
                // feed slot empty.
                if let Ok(parsed) = feed::parse(&body_text) {
                    result.feed = Some(parsed);
                }
            },
            _ => {},
        }
        Ok(())
    }
}

/// Returns the parsed URL when the query is a plausible direct fetch.
fn url_probable(query: &str) -> Option<Url> {
    if !query.starts_with("http://") && !query.starts_with("https://") {
        return None;
    }
    let url = Url::parse(query).ok()?;
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Config;
    use crate::registry::SourcePlugin;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline_with(
        registry: Arc<PluginRegistry>,
        lookup: Option<Arc<dyn LookupProvider>>,
    ) -> SearchPipeline {
        let fetcher = Arc::new(
            Fetcher::new(Config {
                user_agent: "aether-test/0.0".into(),
                enable_memory_cache: false,
                enable_file_cache: false,
                ..Config::default()
            })
            .unwrap(),
        );
        SearchPipeline::new(fetcher, registry, lookup)
    }

    struct FixedSource {
        name: &'static str,
        doc: Option<SearchDocument>,
        fail: bool,
    }

    #[async_trait]
    impl SourcePlugin for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(
            &self,
            _ctx: &CancellationToken,
            _fetcher: &Fetcher,
            _query: &str,
        ) -> Result<Option<SearchDocument>> {
            if self.fail {
                return Err(Error::http("plugin transport failed"));
            }
            Ok(self.doc.clone())
        }
    }

    struct FixedLookup;

    #[async_trait]
    impl LookupProvider for FixedLookup {
        fn name(&self) -> &str {
            "wikipedia"
        }

        async fn lookup(
            &self,
            _ctx: &CancellationToken,
            _fetcher: &Fetcher,
            query: &str,
        ) -> Result<LookupResult> {
            Ok(LookupResult {
                document: Some(SearchDocument {
                    title: format!("Summary of {query}"),
                    kind: "entity".to_string(),
                    content: "A structured summary.".to_string(),
                    ..SearchDocument::default()
                }),
                entities: vec![Entity {
                    id: "Q1".to_string(),
                    label: query.to_string(),
                    ..Entity::default()
                }],
            })
        }
    }

    #[tokio::test]
    async fn empty_query_is_an_error() {
        let pipeline = pipeline_with(Arc::new(PluginRegistry::new()), None);
        let ctx = CancellationToken::new();
        assert!(pipeline.search(&ctx, "   ").await.is_err());
    }

    #[tokio::test]
    async fn url_query_dispatches_directly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><head><title>T</title></head><body><p>Hello page body</p></body></html>")
                    .insert_header("content-type", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let pipeline = pipeline_with(Arc::new(PluginRegistry::new()), None);
        let ctx = CancellationToken::new();
        let url = format!("{}/page", server.uri());
        let result = pipeline.search(&ctx, &url).await.unwrap();

        assert_eq!(result.plan.url.as_deref(), Some(url.as_str()));
        let primary = result.primary.unwrap();
        assert_eq!(primary.kind, "html");
        assert_eq!(primary.metadata.get("source").unwrap(), "direct_fetch");
        assert_eq!(
            primary.metadata.get("content_type").unwrap(),
            "text/html"
        );
        assert!(primary.excerpt.contains("Hello page body"));
        // HTML dispatch also runs article extraction.
        assert!(result.article.is_some());
    }

    #[tokio::test]
    async fn first_answering_plugin_wins_in_stable_order() {
        let registry = Arc::new(PluginRegistry::new());
        registry
            .register_source(Arc::new(FixedSource {
                name: "bravo",
                doc: Some(SearchDocument {
                    title: "from bravo".into(),
                    ..SearchDocument::default()
                }),
                fail: false,
            }))
            .unwrap();
        registry
            .register_source(Arc::new(FixedSource {
                name: "alpha",
                doc: None,
                fail: false,
            }))
            .unwrap();

        let pipeline = pipeline_with(registry, None);
        let ctx = CancellationToken::new();
        let result = pipeline.search(&ctx, "some query here").await.unwrap();
        let primary = result.primary.unwrap();
        // alpha (lexicographically first) returned nothing, bravo answered.
        assert_eq!(primary.title, "from bravo");
        assert_eq!(
            primary.metadata.get(META_SOURCE_PLUGIN).unwrap(),
            "bravo"
        );
    }

    #[tokio::test]
    async fn failing_plugin_is_skipped() {
        let registry = Arc::new(PluginRegistry::new());
        registry
            .register_source(Arc::new(FixedSource {
                name: "a-failing",
                doc: None,
                fail: true,
            }))
            .unwrap();
        registry
            .register_source(Arc::new(FixedSource {
                name: "b-working",
                doc: Some(SearchDocument {
                    title: "answer".into(),
                    ..SearchDocument::default()
                }),
                fail: false,
            }))
            .unwrap();

        let pipeline = pipeline_with(registry, None);
        let ctx = CancellationToken::new();
        let result = pipeline.search(&ctx, "resilient query path").await.unwrap();
        assert_eq!(result.primary.unwrap().title, "answer");
    }

    #[tokio::test]
    async fn lookup_fallback_sets_plan_source() {
        let pipeline = pipeline_with(Arc::new(PluginRegistry::new()), Some(Arc::new(FixedLookup)));
        let ctx = CancellationToken::new();
        let result = pipeline.search(&ctx, "define ownership").await.unwrap();

        assert_eq!(result.plan.source.as_deref(), Some("wikipedia"));
        assert_eq!(result.plan.intent, Intent::Lookup);
        assert!(result.primary.unwrap().title.contains("ownership"));
        assert_eq!(result.entities.len(), 1);
    }

    #[tokio::test]
    async fn no_plugin_no_lookup_yields_empty_result() {
        let pipeline = pipeline_with(Arc::new(PluginRegistry::new()), None);
        let ctx = CancellationToken::new();
        let result = pipeline.search(&ctx, "nothing will answer this").await.unwrap();
        assert!(result.primary.is_none());
        assert!(result.plan.source.is_none());
    }
}
