//! robots.txt parsing and the per-host policy cache.
//!
//! The parser keeps the toolkit's documented grouping behavior: a new group
//! opens only when the previous group already carries rules, so adjacent
//! `User-agent` lines collapse into a single group. Longest-prefix rule
//! matching with Allow winning exact ties follows the common robots
//! convention.
//!
//! Policy lookups are fail-open: a missing robots.txt, a fetch error, or a
//! status of 400 and above all produce an empty rule set that allows
//! everything on that host.

use crate::{Error, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// One allow/deny rule scoped to a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsRule {
    /// True for `Allow`, false for `Disallow`.
    pub allow: bool,
    /// Path prefix the rule applies to.
    pub path: String,
}

/// A block of rules applying to one or more user agents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsGroup {
    /// Lowercased agent tokens this group applies to.
    pub agents: Vec<String>,
    /// Rules in file order.
    pub rules: Vec<RobotsRule>,
}

/// Parsed robots.txt rules for one host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    groups: Vec<RobotsGroup>,
}

impl RobotsRules {
    /// Parses robots.txt text into rule groups.
    ///
    /// Comment lines and blank lines are skipped; directives other than
    /// `User-agent`, `Allow`, and `Disallow` (such as `Crawl-delay` and
    /// `Sitemap`) are ignored.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut groups: Vec<RobotsGroup> = Vec::new();
        let mut current = RobotsGroup::default();

        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_ascii_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    // Only a User-agent line that follows rules opens a new
                    // group; consecutive agent lines accumulate.
                    if !current.rules.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                    if !value.is_empty() {
                        current.agents.push(value.to_ascii_lowercase());
                    }
                },
                "allow" | "disallow" => {
                    // An empty Disallow places no restriction; skip it
                    // rather than record a zero-length prefix.
                    if value.is_empty() {
                        continue;
                    }
                    current.rules.push(RobotsRule {
                        allow: directive == "allow",
                        path: value.to_string(),
                    });
                },
                _ => {},
            }
        }
        if !current.agents.is_empty() || !current.rules.is_empty() {
            groups.push(current);
        }

        Self { groups }
    }

    /// Returns the parsed groups in file order.
    #[must_use]
    pub fn groups(&self) -> &[RobotsGroup] {
        &self.groups
    }

    /// Decides whether `agent` may fetch `path`.
    ///
    /// Groups naming the agent are consulted first, falling back to `*`
    /// groups. The matching rule with the longest path prefix wins; an
    /// exact-length tie between Allow and Disallow resolves to Allow. With
    /// no matching rule the path is allowed.
    #[must_use]
    pub fn allowed(&self, agent: &str, path: &str) -> bool {
        let path = if path.is_empty() { "/" } else { path };
        let agent = agent.to_ascii_lowercase();

        let mut selected: Vec<&RobotsGroup> = self
            .groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && agent.contains(a.as_str())))
            .collect();
        if selected.is_empty() {
            selected = self
                .groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect();
        }

        let mut best_len = 0usize;
        let mut best_allow: Option<bool> = None;
        for group in selected {
            for rule in &group.rules {
                if !path.starts_with(rule.path.as_str()) {
                    continue;
                }
                let len = rule.path.len();
                if len > best_len || best_allow.is_none() {
                    best_len = len;
                    best_allow = Some(rule.allow);
                } else if len == best_len && rule.allow {
                    best_allow = Some(true);
                }
            }
        }
        best_allow.unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
struct CachedPolicy {
    rules: Arc<RobotsRules>,
}

/// Per-host robots policy cache.
///
/// Each host's robots.txt is fetched at most once per process lifetime,
/// using the shared HTTP client directly so the lookup can never recurse
/// through the fetch engine's own robots check.
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    override_enabled: bool,
    allowed_hosts: Vec<String>,
    entries: Mutex<HashMap<String, CachedPolicy>>,
}

impl RobotsCache {
    /// Creates a cache over the shared HTTP client.
    #[must_use]
    pub fn new(
        client: Client,
        user_agent: impl Into<String>,
        override_enabled: bool,
        allowed_hosts: Vec<String>,
    ) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            override_enabled,
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Decides whether the configured agent may fetch `url`.
    pub async fn allowed(&self, url: &Url) -> Result<bool> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::http(format!("url has no host: {url}")))?
            .to_ascii_lowercase();

        if self.override_enabled && self.allowed_hosts.iter().any(|h| h == &host) {
            debug!(host = %host, "robots override active, allowing");
            return Ok(true);
        }

        let rules = self.rules_for(url, &host).await;
        let path = url.path();
        Ok(rules.allowed(&self.user_agent, path))
    }

    /// Returns the cached rules for a host, fetching robots.txt on first
    /// use. The map lock is held only around lookups and insertion; the
    /// HTTP fetch happens outside it.
    async fn rules_for(&self, url: &Url, host: &str) -> Arc<RobotsRules> {
        let key = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        {
            let entries = self.entries.lock().await;
            if let Some(cached) = entries.get(&key) {
                return Arc::clone(&cached.rules);
            }
        }

        let rules = Arc::new(self.fetch_rules(url).await);

        let mut entries = self.entries.lock().await;
        // Another task may have fetched concurrently; first insert wins.
        let entry = entries.entry(key).or_insert_with(|| CachedPolicy {
            rules: Arc::clone(&rules),
        });
        Arc::clone(&entry.rules)
    }

    async fn fetch_rules(&self, url: &Url) -> RobotsRules {
        let mut robots_url = url.clone();
        robots_url.set_path("/robots.txt");
        robots_url.set_query(None);
        robots_url.set_fragment(None);

        let response = self
            .client
            .get(robots_url.as_str())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => {
                    debug!(url = %robots_url, bytes = body.len(), "fetched robots.txt");
                    RobotsRules::parse(&body)
                },
                Err(e) => {
                    warn!(url = %robots_url, error = %e, "robots.txt body read failed, allowing host");
                    RobotsRules::default()
                },
            },
            Ok(response) => {
                debug!(url = %robots_url, status = %response.status(), "robots.txt unavailable, allowing host");
                RobotsRules::default()
            },
            Err(e) => {
                warn!(url = %robots_url, error = %e, "robots.txt fetch failed, allowing host");
                RobotsRules::default()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_single_group() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /private\nAllow: /private/ok\n");
        assert_eq!(rules.groups().len(), 1);
        assert_eq!(rules.groups()[0].agents, vec!["*"]);
        assert_eq!(rules.groups()[0].rules.len(), 2);
    }

    #[test]
    fn consecutive_agent_lines_share_a_group() {
        let rules = RobotsRules::parse(
            "User-agent: alpha\nUser-agent: beta\nDisallow: /x\n\nUser-agent: gamma\nDisallow: /y\n",
        );
        assert_eq!(rules.groups().len(), 2);
        assert_eq!(rules.groups()[0].agents, vec!["alpha", "beta"]);
        assert_eq!(rules.groups()[1].agents, vec!["gamma"]);
    }

    #[test]
    fn agent_line_without_prior_rules_joins_current_group() {
        // Documented divergence from strict RFC grouping: the blank line
        // does not close a rule-less group.
        let rules = RobotsRules::parse("User-agent: alpha\n\nUser-agent: beta\nDisallow: /x\n");
        assert_eq!(rules.groups().len(), 1);
        assert_eq!(rules.groups()[0].agents, vec!["alpha", "beta"]);
    }

    #[test]
    fn comments_and_unknown_directives_are_ignored() {
        let rules = RobotsRules::parse(
            "# a comment\nUser-agent: *\nCrawl-delay: 10\nSitemap: https://h/sitemap.xml\nDisallow: /p\n",
        );
        assert_eq!(rules.groups().len(), 1);
        assert_eq!(rules.groups()[0].rules.len(), 1);
    }

    #[test]
    fn longest_prefix_wins() {
        let rules =
            RobotsRules::parse("User-agent: *\nDisallow: /a\nAllow: /a/b\n");
        assert!(!rules.allowed("bot", "/a/x"));
        assert!(rules.allowed("bot", "/a/b/c"));
        assert!(rules.allowed("bot", "/other"));
    }

    #[test]
    fn allow_wins_exact_tie() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /dir\nAllow: /dir\n");
        assert!(rules.allowed("bot", "/dir/page"));
    }

    #[test]
    fn no_matching_rule_allows() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /private\n");
        assert!(rules.allowed("bot", "/public"));
    }

    #[test]
    fn empty_path_treated_as_root() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /\n");
        assert!(!rules.allowed("bot", ""));
        assert!(!rules.allowed("bot", "/anything"));
    }

    #[test]
    fn specific_agent_group_preferred_over_wildcard() {
        let rules = RobotsRules::parse(
            "User-agent: *\nDisallow: /\n\nUser-agent: aether\nAllow: /\n",
        );
        assert!(rules.allowed("aether/0.4.0", "/page"));
        assert!(!rules.allowed("otherbot", "/page"));
    }

    #[test]
    fn agent_match_is_case_insensitive() {
        let rules = RobotsRules::parse("User-agent: Aether\nDisallow: /x\n");
        assert!(!rules.allowed("AETHER/1.0", "/x/y"));
    }

    #[test]
    fn empty_disallow_places_no_restriction() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow:\n");
        assert!(rules.allowed("bot", "/anything"));
    }

    #[test]
    fn empty_input_allows_everything() {
        let rules = RobotsRules::parse("");
        assert!(rules.allowed("bot", "/any/path"));
    }

    proptest! {
        #[test]
        fn parser_never_panics(body in ".{0,2000}") {
            let _ = RobotsRules::parse(&body);
        }

        #[test]
        fn decision_never_panics(body in ".{0,500}", agent in ".{0,40}", req in ".{0,100}") {
            let rules = RobotsRules::parse(&body);
            let _ = rules.allowed(&agent, &req);
        }
    }

    fn test_client() -> Client {
        Client::builder().build().unwrap()
    }

    #[tokio::test]
    async fn cache_fetches_robots_once_per_host() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = RobotsCache::new(test_client(), "aether-test", false, vec![]);
        let private = Url::parse(&format!("{}/private/x", server.uri())).unwrap();
        let public = Url::parse(&format!("{}/public", server.uri())).unwrap();

        assert!(!cache.allowed(&private).await.unwrap());
        assert!(cache.allowed(&public).await.unwrap());
        // Second call on the same host must not refetch (expect(1) above).
    }

    #[tokio::test]
    async fn missing_robots_is_fail_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = RobotsCache::new(test_client(), "aether-test", false, vec![]);
        let url = Url::parse(&format!("{}/anything", server.uri())).unwrap();
        assert!(cache.allowed(&url).await.unwrap());
    }

    #[tokio::test]
    async fn server_error_robots_is_fail_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cache = RobotsCache::new(test_client(), "aether-test", false, vec![]);
        let url = Url::parse(&format!("{}/x", server.uri())).unwrap();
        assert!(cache.allowed(&url).await.unwrap());
    }

    #[tokio::test]
    async fn override_skips_robots_entirely() {
        // No mock server at all: the override must short-circuit before any
        // network activity.
        let cache = RobotsCache::new(
            test_client(),
            "aether-test",
            true,
            vec!["trusted.example".to_string()],
        );
        let url = Url::parse("https://trusted.example/private").unwrap();
        assert!(cache.allowed(&url).await.unwrap());
    }
}
