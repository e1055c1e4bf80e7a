//! Pure query classification and route planning.
//!
//! No I/O here: `classify` inspects the query text alone, and
//! `build_route` is a fixed table from intent to source lists, so the same
//! query always produces the same plan.

use serde::{Deserialize, Serialize};

/// Inferred intent of a query, evaluated by a fixed ladder of rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Nothing matched, or the query is a bare URL.
    #[default]
    Unknown,
    /// Definition or encyclopedia style lookup.
    Lookup,
    /// News and current events.
    News,
    /// Hacker News specifically.
    Hackernews,
    /// Documentation and references.
    Docs,
    /// Programming errors and troubleshooting.
    CodeHelp,
    /// GitHub repositories and projects.
    Github,
    /// Broad web search.
    GeneralSearch,
}

impl Intent {
    /// Stable lowercase identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Lookup => "lookup",
            Self::News => "news",
            Self::Hackernews => "hackernews",
            Self::Docs => "docs",
            Self::CodeHelp => "code_help",
            Self::Github => "github",
            Self::GeneralSearch => "general_search",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    /// The query as given.
    pub raw: String,
    /// Inferred intent.
    pub intent: Intent,
    /// Whether the query reads like a question.
    pub is_question: bool,
    /// Whether the query looks like a URL.
    pub has_url: bool,
    /// Lowercased word tokens of the query.
    pub keywords: Vec<String>,
}

/// Deterministic retrieval plan for an intent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Sources to try first, in order.
    pub primary_sources: Vec<String>,
    /// Sources to fall back to, in order.
    pub fallback_sources: Vec<String>,
    /// Whether the structured lookup collaborator participates.
    pub use_lookup: bool,
    /// Whether a search index participates.
    pub use_search_index: bool,
    /// Whether open public APIs participate.
    pub use_open_apis: bool,
    /// Whether feed sources participate.
    pub use_feeds: bool,
    /// Plugins always participate.
    pub use_plugins: bool,
}

const LOOKUP_KEYWORDS: &[&str] = &[
    "define", "definition", "meaning of", "what is", "who is", "wiki", "wikipedia",
];
const NEWS_KEYWORDS: &[&str] = &["news", "latest", "headlines", "breaking", "rss", "feed"];
const HACKERNEWS_KEYWORDS: &[&str] = &["hacker news", "hackernews", "hn"];
const DOCS_KEYWORDS: &[&str] = &[
    "docs",
    "documentation",
    "reference",
    "api reference",
    "manual",
    "how to use",
];
const CODE_KEYWORDS: &[&str] = &[
    "error",
    "exception",
    "stack trace",
    "panic",
    "compile",
    "undefined",
    "traceback",
];
const GITHUB_KEYWORDS: &[&str] = &["github", "repo", "repository", "readme"];

/// True when the query contains the keyword: multi-word phrases match as
/// substrings, single words must match a whole token.
fn contains_keyword(lower: &str, tokens: &[String], keyword: &str) -> bool {
    if keyword.contains(' ') {
        lower.contains(keyword)
    } else {
        tokens.iter().any(|t| t == keyword)
    }
}

fn matches_any(lower: &str, tokens: &[String], keywords: &[&str]) -> bool {
    keywords.iter().any(|k| contains_keyword(lower, tokens, k))
}

/// Classifies a query into intent and structural signals.
#[must_use]
pub fn classify(query: &str) -> Classification {
    let raw = query.to_string();
    let trimmed = query.trim();
    let lower = trimmed.to_ascii_lowercase();

    let tokens: Vec<String> = lower
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let has_url = lower.starts_with("http://")
        || lower.starts_with("https://")
        || (trimmed.contains('.') && !trimmed.chars().any(char::is_whitespace));

    let is_question = trimmed.ends_with('?')
        || ["what ", "who ", "how ", "why ", "when "]
            .iter()
            .any(|prefix| lower.starts_with(prefix));

    let url_only = has_url && !trimmed.chars().any(char::is_whitespace);

    let intent = if url_only {
        Intent::Unknown
    } else if matches_any(&lower, &tokens, LOOKUP_KEYWORDS) {
        Intent::Lookup
    } else if matches_any(&lower, &tokens, NEWS_KEYWORDS)
        && !matches_any(&lower, &tokens, HACKERNEWS_KEYWORDS)
    {
        // "hacker news" would otherwise be swallowed by the news rule.
        Intent::News
    } else if matches_any(&lower, &tokens, HACKERNEWS_KEYWORDS) {
        Intent::Hackernews
    } else if matches_any(&lower, &tokens, DOCS_KEYWORDS) {
        Intent::Docs
    } else if matches_any(&lower, &tokens, CODE_KEYWORDS) {
        Intent::CodeHelp
    } else if matches_any(&lower, &tokens, GITHUB_KEYWORDS) {
        Intent::Github
    } else if is_question {
        Intent::GeneralSearch
    } else if tokens.len() <= 2 && !has_url {
        Intent::Lookup
    } else {
        Intent::GeneralSearch
    };

    Classification {
        raw,
        intent,
        is_question,
        has_url,
        keywords: tokens,
    }
}

/// Maps a classification to its fixed retrieval plan.
#[must_use]
pub fn build_route(classification: &Classification) -> RoutePlan {
    let sources = |primary: &[&str], fallback: &[&str]| {
        (
            primary.iter().map(ToString::to_string).collect::<Vec<_>>(),
            fallback.iter().map(ToString::to_string).collect::<Vec<_>>(),
        )
    };

    let mut plan = RoutePlan {
        use_plugins: true,
        ..RoutePlan::default()
    };

    let (primary, fallback) = match classification.intent {
        Intent::Lookup => {
            plan.use_lookup = true;
            plan.use_open_apis = true;
            sources(&["wikipedia"], &["search_index"])
        },
        Intent::News => {
            plan.use_feeds = true;
            sources(&["feeds"], &["search_index"])
        },
        Intent::Hackernews => {
            plan.use_open_apis = true;
            plan.use_feeds = true;
            sources(&["hackernews"], &["feeds"])
        },
        Intent::Docs => {
            plan.use_search_index = true;
            sources(&["docs_index"], &["search_index"])
        },
        Intent::CodeHelp => {
            plan.use_search_index = true;
            sources(&["docs_index", "github"], &["search_index"])
        },
        Intent::Github => {
            plan.use_open_apis = true;
            sources(&["github"], &["search_index"])
        },
        Intent::Unknown | Intent::GeneralSearch => {
            plan.use_search_index = true;
            plan.use_lookup = true;
            sources(&["search_index"], &["wikipedia"])
        },
    };
    plan.primary_sources = primary;
    plan.fallback_sources = fallback;
    plan
}
