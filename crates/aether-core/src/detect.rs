//! Content-type detection and page metadata extraction.
//!
//! Detection prefers the server's `Content-Type` header, falls back to
//! sniffing the first bytes of the body, and sub-classifies HTML pages by
//! cheap keyword heuristics. An empty body with no usable header stays
//! `unknown`.

use crate::types::collapse_whitespace;
use scraper::{Html, Selector};
use std::collections::BTreeMap;

/// Detected content classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Nothing could be determined.
    #[default]
    Unknown,
    /// An HTML document.
    Html,
    /// A JSON payload.
    Json,
    /// Generic XML.
    Xml,
    /// An RSS or Atom feed.
    Rss,
    /// A PDF document.
    Pdf,
    /// Plain text.
    Text,
    /// An image.
    Image,
    /// Unrecognized binary content.
    Binary,
    /// HTML carrying an `<article>` element.
    Article,
    /// HTML that reads like documentation.
    Docs,
    /// HTML with homepage-style chrome.
    Homepage,
}

impl ContentType {
    /// Stable lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Html => "html",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Rss => "rss",
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::Image => "image",
            Self::Binary => "binary",
            Self::Article => "article",
            Self::Docs => "docs",
            Self::Homepage => "homepage",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full detection result for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Primary classification.
    pub raw_type: ContentType,
    /// HTML sub-classification, when `raw_type` is HTML.
    pub sub_type: ContentType,
    /// MIME type as reported, parameters stripped.
    pub mime: String,
    /// Character set from the `Content-Type` parameters, if present.
    pub charset: String,
    /// `Content-Encoding` header value, if present.
    pub encoding: String,
    /// Whether the content is non-textual.
    pub is_binary: bool,
}

/// Classifies a response body using its headers and a body sniff.
#[must_use]
pub fn detect(headers: &BTreeMap<String, String>, body: &[u8]) -> Detection {
    let content_type = headers
        .get("content-type")
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default();

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    let charset = content_type
        .split(';')
        .skip(1)
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            (key.trim() == "charset").then(|| value.trim().trim_matches('"').to_string())
        })
        .next()
        .unwrap_or_default();
    let encoding = headers.get("content-encoding").cloned().unwrap_or_default();

    let mut detection = Detection {
        mime,
        charset,
        encoding,
        ..Detection::default()
    };

    detection.raw_type = classify_header(&content_type);
    if detection.raw_type == ContentType::Unknown {
        detection.raw_type = sniff_body(body);
    }
    detection.is_binary = matches!(
        detection.raw_type,
        ContentType::Image | ContentType::Binary | ContentType::Pdf
    );

    if detection.raw_type == ContentType::Html {
        detection.sub_type = classify_html(body);
    }

    detection
}

fn classify_header(content_type: &str) -> ContentType {
    if content_type.is_empty() {
        return ContentType::Unknown;
    }
    if content_type.contains("html") {
        ContentType::Html
    } else if content_type.contains("json") {
        ContentType::Json
    } else if content_type.contains("rss") || content_type.contains("atom+xml") {
        ContentType::Rss
    } else if content_type.contains("xml") {
        ContentType::Xml
    } else if content_type.contains("pdf") {
        ContentType::Pdf
    } else if content_type.contains("text/plain") {
        ContentType::Text
    } else if content_type.starts_with("image/") {
        ContentType::Image
    } else {
        ContentType::Unknown
    }
}

/// Sniffs the first 64 bytes of the trimmed body.
fn sniff_body(body: &[u8]) -> ContentType {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return ContentType::Unknown;
    }
    let head: String = trimmed.chars().take(64).collect::<String>().to_ascii_lowercase();

    if (head.starts_with('{') || head.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed.trim_end()).is_ok()
    {
        return ContentType::Json;
    }
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return ContentType::Html;
    }
    if head.starts_with("<?xml") {
        return ContentType::Xml;
    }
    ContentType::Binary
}

/// Keyword heuristics over the raw HTML body.
fn classify_html(body: &[u8]) -> ContentType {
    let text = String::from_utf8_lossy(body).to_ascii_lowercase();
    if text.contains("<article") {
        return ContentType::Article;
    }
    if text.contains("documentation") || text.contains("docs") || text.contains("api reference") {
        return ContentType::Docs;
    }
    if text.contains("<nav") && text.contains("<main") && text.contains("<footer") {
        return ContentType::Homepage;
    }
    ContentType::Unknown
}

/// Title and meta-tag extraction for HTML responses.
///
/// `property` attributes take precedence over `name`; well-known
/// OpenGraph/Twitter keys are additionally promoted to the canonical
/// `title`, `description`, and `canonical_url` keys.
#[must_use]
pub fn extract_page_meta(html: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut meta = BTreeMap::new();

    #[allow(clippy::unwrap_used)] // static selectors are known-valid
    let title_selector = Selector::parse("title").unwrap();
    if let Some(title) = document.select(&title_selector).next() {
        let text = collapse_whitespace(&title.text().collect::<String>());
        if !text.is_empty() {
            meta.insert("title".to_string(), text);
        }
    }

    #[allow(clippy::unwrap_used)]
    let meta_selector = Selector::parse("meta").unwrap();
    let mut named: BTreeMap<String, String> = BTreeMap::new();
    for element in document.select(&meta_selector) {
        let Some(content) = element.value().attr("content") else {
            continue;
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        // property wins over name for the same key.
        if let Some(property) = element.value().attr("property") {
            named.insert(property.to_ascii_lowercase(), content.to_string());
        } else if let Some(name) = element.value().attr("name") {
            named
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| content.to_string());
        }
    }

    for (canonical, candidates) in [
        ("title", ["og:title", "twitter:title"].as_slice()),
        (
            "description",
            ["og:description", "twitter:description"].as_slice(),
        ),
        ("canonical_url", ["og:url"].as_slice()),
    ] {
        for candidate in candidates {
            if let Some(value) = named.get(*candidate) {
                meta.entry(canonical.to_string())
                    .or_insert_with(|| value.clone());
                break;
            }
        }
    }

    for (key, value) in named {
        meta.entry(key).or_insert(value);
    }
    meta
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers_with(content_type: &str) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if !content_type.is_empty() {
            headers.insert("content-type".to_string(), content_type.to_string());
        }
        headers
    }

    #[test]
    fn header_keywords_classify() {
        let cases = [
            ("text/html; charset=utf-8", ContentType::Html),
            ("application/json", ContentType::Json),
            ("application/rss+xml", ContentType::Rss),
            ("application/atom+xml", ContentType::Rss),
            ("application/xml", ContentType::Xml),
            ("application/pdf", ContentType::Pdf),
            ("text/plain", ContentType::Text),
            ("image/png", ContentType::Image),
        ];
        for (header, expected) in cases {
            let detection = detect(&headers_with(header), b"irrelevant");
            assert_eq!(detection.raw_type, expected, "header {header}");
        }
    }

    #[test]
    fn charset_and_encoding_are_extracted() {
        let mut headers = headers_with("text/html; charset=UTF-8");
        headers.insert("content-encoding".to_string(), "gzip".to_string());
        let detection = detect(&headers, b"<html></html>");
        assert_eq!(detection.mime, "text/html");
        assert_eq!(detection.charset, "utf-8");
        assert_eq!(detection.encoding, "gzip");
    }

    #[test]
    fn image_and_pdf_are_binary() {
        assert!(detect(&headers_with("image/jpeg"), b"\xff\xd8").is_binary);
        assert!(detect(&headers_with("application/pdf"), b"%PDF").is_binary);
        assert!(!detect(&headers_with("text/html"), b"<html>").is_binary);
    }

    #[test]
    fn sniff_falls_back_when_header_is_absent() {
        let none = BTreeMap::new();
        assert_eq!(detect(&none, b"{\"a\": 1}").raw_type, ContentType::Json);
        assert_eq!(detect(&none, b"[1, 2, 3]").raw_type, ContentType::Json);
        assert_eq!(
            detect(&none, b"<!DOCTYPE html><html></html>").raw_type,
            ContentType::Html
        );
        assert_eq!(detect(&none, b"<html lang=\"en\">").raw_type, ContentType::Html);
        assert_eq!(
            detect(&none, b"<?xml version=\"1.0\"?><root/>").raw_type,
            ContentType::Xml
        );
        assert_eq!(detect(&none, b"\x00\x01\x02").raw_type, ContentType::Binary);
    }

    #[test]
    fn leading_brace_without_valid_json_is_binary() {
        let none = BTreeMap::new();
        assert_eq!(detect(&none, b"{ not json").raw_type, ContentType::Binary);
    }

    #[test]
    fn empty_body_sniff_is_unknown() {
        let none = BTreeMap::new();
        assert_eq!(detect(&none, b"").raw_type, ContentType::Unknown);
        assert_eq!(detect(&none, b"   \n\t ").raw_type, ContentType::Unknown);
    }

    #[test]
    fn html_subtype_article() {
        let body = b"<html><body><article><p>Story</p></article></body></html>";
        let detection = detect(&headers_with("text/html"), body);
        assert_eq!(detection.sub_type, ContentType::Article);
    }

    #[test]
    fn html_subtype_docs() {
        let body = b"<html><body><h1>API Reference</h1></body></html>";
        let detection = detect(&headers_with("text/html"), body);
        assert_eq!(detection.sub_type, ContentType::Docs);
    }

    #[test]
    fn html_subtype_homepage_requires_all_three_landmarks() {
        let body = b"<html><body><nav></nav><main></main><footer></footer></body></html>";
        let detection = detect(&headers_with("text/html"), body);
        assert_eq!(detection.sub_type, ContentType::Homepage);

        let partial = b"<html><body><nav></nav><main></main></body></html>";
        let detection = detect(&headers_with("text/html"), partial);
        assert_eq!(detection.sub_type, ContentType::Unknown);
    }

    #[test]
    fn page_meta_prefers_property_over_name() {
        let html = r#"<html><head>
            <title>  Page   Title </title>
            <meta name="description" content="from name">
            <meta property="description" content="from property">
        </head></html>"#;
        let meta = extract_page_meta(html);
        assert_eq!(meta.get("title").unwrap(), "Page Title");
        assert_eq!(meta.get("description").unwrap(), "from property");
    }

    #[test]
    fn page_meta_promotes_opengraph_keys() {
        let html = r#"<html><head>
            <meta property="og:description" content="og desc">
            <meta name="twitter:description" content="tw desc">
            <meta property="og:url" content="https://example.com/canonical">
        </head></html>"#;
        let meta = extract_page_meta(html);
        // og wins over twitter for the promoted key.
        assert_eq!(meta.get("description").unwrap(), "og desc");
        assert_eq!(
            meta.get("canonical_url").unwrap(),
            "https://example.com/canonical"
        );
        // The raw keys remain available.
        assert_eq!(meta.get("og:description").unwrap(), "og desc");
    }

    #[test]
    fn document_title_tag_outranks_promoted_og_title() {
        let html = r#"<html><head>
            <title>Real Title</title>
            <meta property="og:title" content="OG Title">
        </head></html>"#;
        let meta = extract_page_meta(html);
        assert_eq!(meta.get("title").unwrap(), "Real Title");
        assert_eq!(meta.get("og:title").unwrap(), "OG Title");
    }
}
