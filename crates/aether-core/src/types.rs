//! Core data structures shared across the pipeline.
//!
//! Every retrieval path converges on [`Document`], the canonical shape
//! consumed by the TOON serializers. [`FetchResponse`] is the immutable
//! hand-off unit between the fetch engine, the cache, and callers; headers
//! and body are cloned at each boundary so no party can mutate another's
//! view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key carrying the classified query intent after normalization.
pub const META_INTENT: &str = "aether.intent";

/// Metadata key naming the source plugin that produced a search document.
pub const META_SOURCE_PLUGIN: &str = "aether.source_plugin";

/// Classification of what a canonical document fundamentally is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    /// Nothing more specific could be determined.
    #[default]
    Unknown,
    /// Readability-extracted article content.
    Article,
    /// A generic HTML page.
    HtmlPage,
    /// An RSS or Atom feed.
    Feed,
    /// Structured JSON payload.
    Json,
    /// Plain text.
    Text,
    /// Non-textual content.
    Binary,
    /// A structured entity (for example a lookup result).
    Entity,
}

impl DocKind {
    /// Stable lowercase identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Article => "article",
            Self::HtmlPage => "html_page",
            Self::Feed => "feed",
            Self::Json => "json",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Entity => "entity",
        }
    }

    /// Parses the serialized form; anything unrecognized is `Unknown`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "article" => Self::Article,
            "html_page" | "html" => Self::HtmlPage,
            "feed" | "rss" | "atom" => Self::Feed,
            "json" => Self::Json,
            "text" => Self::Text,
            "binary" => Self::Binary,
            "entity" => Self::Entity,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a [`Section`] plays inside a canonical document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionRole {
    /// Main body content.
    Body,
    /// A short summary block.
    Summary,
    /// One item of a parsed feed.
    FeedItem,
    /// Auxiliary metadata rendered as content.
    Metadata,
    /// A structured entity.
    Entity,
    /// Unclassified.
    #[default]
    Unknown,
}

impl SectionRole {
    /// Stable lowercase identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Summary => "summary",
            Self::FeedItem => "feed_item",
            Self::Metadata => "metadata",
            Self::Entity => "entity",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SectionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered content block inside a [`Document`].
///
/// Sections preserve insertion order; merge stages append, never
/// interleave.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    /// What this block is.
    pub role: SectionRole,
    /// Optional heading for the block.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub heading: String,
    /// The block's text content.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Per-section metadata pairs, iterated in key order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl Section {
    /// Creates a section with the given role and text, no heading.
    #[must_use]
    pub fn new(role: SectionRole, text: impl Into<String>) -> Self {
        Self {
            role,
            heading: String::new(),
            text: text.into(),
            meta: BTreeMap::new(),
        }
    }

    /// Sets the heading.
    #[must_use]
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = heading.into();
        self
    }

    /// Adds one metadata pair.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// The single normalized shape every retrieval path converges to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Origin identifier, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// What this document is. Always set; defaults to `unknown`.
    #[serde(default)]
    pub kind: DocKind,
    /// Display title. Never absent, but may be empty before normalization.
    #[serde(default)]
    pub title: String,
    /// Short summary, at most ~240 characters after normalization.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub excerpt: String,
    /// Main body text, plain.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Flat metadata; namespaced keys are conventionally dot-prefixed
    /// (for example `aether.intent`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Ordered content sections.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}

/// A structured entity produced by a lookup source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier for the entity.
    pub id: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Canonical URL for the entity, when known.
    #[serde(default)]
    pub url: String,
    /// Additional key/value detail.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

/// One fetched HTTP response, treated as immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// The URL the response was fetched from.
    pub url: String,
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers with lowercased names.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: Vec<u8>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

impl FetchResponse {
    /// Looks up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Body interpreted as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A primary document produced by the search pipeline or a source plugin,
/// before normalization. `kind` stays a free-form string here; the
/// normalizer maps it onto [`DocKind`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Origin URL, when the document came from one.
    #[serde(default)]
    pub url: String,
    /// Kind string (for example `html`, `json`, `article`).
    #[serde(default)]
    pub kind: String,
    /// Display title, possibly empty.
    #[serde(default)]
    pub title: String,
    /// Short summary, possibly empty.
    #[serde(default)]
    pub excerpt: String,
    /// Main text content.
    #[serde(default)]
    pub content: String,
    /// Flat metadata pairs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// One page delivered to a crawl visitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Canonical URL of the page.
    pub url: String,
    /// Depth from the crawl root (root is 0).
    pub depth: usize,
    /// HTTP status the page was fetched with.
    pub status: u16,
    /// Page body as text.
    pub content: String,
    /// Detection metadata (`content_type`, and title/description when the
    /// page was HTML).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Collapses any run of ASCII whitespace to a single space and trims.
#[must_use]
pub fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for ch in input.chars() {
        if matches!(ch, ' ' | '\t' | '\n' | '\r') {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }
    out
}
