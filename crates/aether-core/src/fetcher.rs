//! The polite fetch engine.
//!
//! `Fetcher` is the only component that talks HTTP on behalf of the
//! toolkit. Every fetch flows through the same funnel: URL validation, the
//! host concurrency gate, the robots policy cache, the layered response
//! cache, and finally a bounded retry loop with exponential backoff.
//! Responses handed to callers and to the cache are independent copies, so
//! neither side can mutate the other's view.
//!
//! Plugins must use this surface ([`Fetcher::fetch`], [`Fetcher::fetch_raw`],
//! [`Fetcher::fetch_text`], [`Fetcher::fetch_json`], [`Fetcher::batch`])
//! rather than raw HTTP; that keeps robots compliance and pacing uniform.

use crate::cache::LayeredCache;
use crate::limiter::HostGate;
use crate::robots::RobotsCache;
use crate::types::FetchResponse;
use crate::{Config, Error, Result};
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Total attempts per fetch: the first try plus two retries.
const MAX_ATTEMPTS: u32 = 3;

/// Initial retry backoff; doubles per retry.
const BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Options for [`Fetcher::batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Parallelism bound; zero means the engine's per-host default.
    pub concurrency: usize,
    /// Extra headers applied to every request in the batch.
    pub headers: Option<BTreeMap<String, String>>,
}

/// One entry of a batch result, positionally matching the input URLs.
#[derive(Debug)]
pub struct BatchItem {
    /// The requested URL.
    pub url: String,
    /// The fetch outcome; errors are carried per item, never aborting the
    /// batch.
    pub result: Result<FetchResponse>,
}

enum AttemptError {
    Retryable(Error),
    Fatal(Error),
}

/// Robots-aware, cache-backed HTTP fetch engine.
pub struct Fetcher {
    client: Client,
    config: Config,
    gate: HostGate,
    robots: RobotsCache,
    cache: LayeredCache,
}

impl Fetcher {
    /// Builds an engine from configuration. Fails on invalid configuration
    /// or an unconstructible HTTP client.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::http_with_source("failed to build http client", e))?;

        let robots = RobotsCache::new(
            client.clone(),
            config.user_agent.clone(),
            config.robots_override_enabled,
            config.robots_allowed_hosts.clone(),
        );
        let cache = LayeredCache::from_config(&config);
        let gate = HostGate::new(config.max_concurrent_hosts, config.max_requests_per_host);

        Ok(Self {
            client,
            config,
            gate,
            robots,
            cache,
        })
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches one URL through the full politeness funnel.
    pub async fn fetch(
        &self,
        ctx: &CancellationToken,
        url: &str,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<FetchResponse> {
        let parsed =
            Url::parse(url).map_err(|e| Error::http(format!("invalid url {url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::http(format!("url has no host: {url}")))?
            .to_string();

        // Held until return on every exit path below.
        let _permit = self.gate.acquire(&host, ctx).await?;

        if !self.robots.allowed(&parsed).await? {
            return Err(Error::Robots {
                url: parsed.to_string(),
            });
        }

        if let Some(bytes) = self.cache.get(parsed.as_str()).await {
            match serde_json::from_slice::<FetchResponse>(&bytes) {
                Ok(cached) => {
                    debug!(url = %parsed, "serving fetch from cache");
                    return Ok(cached);
                },
                Err(e) => debug!(url = %parsed, error = %e, "discarding undecodable cache entry"),
            }
        }

        let header_map = self.effective_headers(headers);

        let mut last_err: Option<Error> = None;
        for attempt in 0..MAX_ATTEMPTS {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if attempt > 0 {
                let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                debug!(url = %parsed, attempt, backoff_ms = backoff.as_millis() as u64, "retrying fetch");
                tokio::time::sleep(backoff).await;
            }

            match self.execute(&parsed, &header_map).await {
                Ok(response) => {
                    if response.status_code == 200 {
                        self.store(&response).await;
                    }
                    info!(url = %parsed, status = response.status_code, bytes = response.body.len(), "fetched");
                    return Ok(response);
                },
                Err(AttemptError::Retryable(e)) => last_err = Some(e),
                Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::http(format!("fetch failed after retries: {parsed}"))))
    }

    /// Fetches a URL and returns the raw body and response headers.
    pub async fn fetch_raw(
        &self,
        ctx: &CancellationToken,
        url: &str,
    ) -> Result<(Vec<u8>, BTreeMap<String, String>)> {
        let response = self.fetch(ctx, url, None).await?;
        Ok((response.body, response.headers))
    }

    /// Fetches a URL and returns the body as text plus response headers.
    pub async fn fetch_text(
        &self,
        ctx: &CancellationToken,
        url: &str,
    ) -> Result<(String, BTreeMap<String, String>)> {
        let response = self.fetch(ctx, url, None).await?;
        let headers = response.headers.clone();
        Ok((response.body_text(), headers))
    }

    /// Fetches a URL and decodes its body as JSON into `T`.
    pub async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &CancellationToken,
        url: &str,
    ) -> Result<T> {
        let response = self.fetch(ctx, url, None).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| Error::Parsing(format!("json decode of {url} failed: {e}")))
    }

    /// Fetches many URLs concurrently, preserving input order in the
    /// result. Per-item failures are carried inside the corresponding
    /// [`BatchItem`].
    pub async fn batch(
        &self,
        ctx: &CancellationToken,
        urls: &[String],
        options: &BatchOptions,
    ) -> Vec<BatchItem> {
        let concurrency = if options.concurrency == 0 {
            self.config.max_requests_per_host
        } else {
            options.concurrency
        };

        futures::stream::iter(urls.iter().cloned())
            .map(|url| {
                let headers = options.headers.as_ref();
                async move {
                    let result = self.fetch(ctx, &url, headers).await;
                    BatchItem { url, result }
                }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    fn effective_headers(&self, headers: Option<&BTreeMap<String, String>>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(headers) = headers {
            for (name, value) in headers {
                let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                    debug!(header = %name, "skipping invalid header name");
                    continue;
                };
                let Ok(value) = HeaderValue::from_str(value) else {
                    debug!(header = %name, "skipping invalid header value");
                    continue;
                };
                map.insert(name, value);
            }
        }
        // The configured identity always wins; Accept only fills a gap.
        if let Ok(ua) = HeaderValue::from_str(&self.config.user_agent) {
            map.insert(reqwest::header::USER_AGENT, ua);
        }
        map.entry(reqwest::header::ACCEPT)
            .or_insert_with(|| HeaderValue::from_static("*/*"));
        map
    }

    async fn execute(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> std::result::Result<FetchResponse, AttemptError> {
        let response = self
            .client
            .get(url.as_str())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| {
                let transient = e.is_timeout() || e.is_connect();
                let wrapped = Error::http_with_source(format!("GET {url} failed"), e);
                if transient {
                    AttemptError::Retryable(wrapped)
                } else {
                    AttemptError::Fatal(wrapped)
                }
            })?;

        let status = response.status().as_u16();
        let mut header_map = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                header_map.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        // A failed body read is always worth another attempt.
        let body = response.bytes().await.map_err(|e| {
            AttemptError::Retryable(Error::http_with_source(
                format!("body read of {url} failed"),
                e,
            ))
        })?;

        Ok(FetchResponse {
            url: url.to_string(),
            status_code: status,
            headers: header_map,
            body: body.to_vec(),
            fetched_at: chrono::Utc::now(),
        })
    }

    async fn store(&self, response: &FetchResponse) {
        if !self.cache.is_enabled() {
            return;
        }
        match serde_json::to_vec(response) {
            Ok(bytes) => {
                self.cache
                    .set(&response.url, &bytes, self.config.cache_ttl())
                    .await;
            },
            Err(e) => warn!(url = %response.url, error = %e, "failed to serialize response for cache"),
        }
    }

    /// Drops a URL from the memory cache tier. Primarily for tests and
    /// cache-promotion verification.
    pub fn evict_memory(&self, url: &str) {
        self.cache.evict_memory(url);
    }
}
