//! Structural HTML parsing and the five basic extractors.
//!
//! A thin wrapper over an html5ever-backed document tree. Extractors
//! return owned data so the parsed tree never has to live across an await
//! point in async callers.

use crate::types::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

/// A heading with its level, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Heading level, 1 through 6.
    pub level: u8,
    /// Collapsed heading text.
    pub text: String,
}

/// An anchor with a hyperlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The raw `href` attribute.
    pub href: String,
    /// Collapsed anchor text.
    pub text: String,
    /// The `rel` attribute, empty when absent.
    pub rel: String,
}

/// Parsed HTML document exposing the structural extractors.
pub struct HtmlDocument {
    document: Html,
}

fn selector(css: &str) -> Selector {
    #[allow(clippy::unwrap_used)] // all selectors in this module are static
    Selector::parse(css).unwrap()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

impl HtmlDocument {
    /// Parses an HTML document. The parser is lenient; malformed input
    /// yields a best-effort tree rather than an error.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// First `<title>` text, whitespace-collapsed. Empty when absent.
    #[must_use]
    pub fn title(&self) -> String {
        self.document
            .select(&selector("title"))
            .next()
            .map(element_text)
            .unwrap_or_default()
    }

    /// Meta-tag map, including OpenGraph/Twitter promotions.
    #[must_use]
    pub fn meta(&self) -> std::collections::BTreeMap<String, String> {
        crate::detect::extract_page_meta(&self.document.html())
    }

    /// All `h1`..`h6` headings in document order.
    #[must_use]
    pub fn headings(&self) -> Vec<Heading> {
        let mut headings = Vec::new();
        for element in self.document.select(&selector("h1, h2, h3, h4, h5, h6")) {
            let name = element.value().name();
            let level = name
                .strip_prefix('h')
                .and_then(|l| l.parse::<u8>().ok())
                .unwrap_or(6);
            let text = element_text(element);
            if !text.is_empty() {
                headings.push(Heading { level, text });
            }
        }
        headings
    }

    /// All `<p>` texts of at least five characters, boilerplate filtered.
    #[must_use]
    pub fn paragraphs(&self) -> Vec<String> {
        self.document
            .select(&selector("p"))
            .map(element_text)
            .filter(|text| text.len() >= 5 && !is_boilerplate_paragraph(text))
            .collect()
    }

    /// All `<a>` elements carrying an `href`.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        self.document
            .select(&selector("a[href]"))
            .filter_map(|element| {
                let href = element.value().attr("href")?.to_string();
                Some(Link {
                    href,
                    text: element_text(element),
                    rel: element.value().attr("rel").unwrap_or_default().to_string(),
                })
            })
            .collect()
    }

    /// The underlying tree, for the article extractor.
    #[must_use]
    pub(crate) const fn tree(&self) -> &Html {
        &self.document
    }
}

fn is_boilerplate_paragraph(text: &str) -> bool {
    text.starts_with('©') || text.to_ascii_lowercase().contains("cookies")
}

/// Extracts all `href` values from `html` in one synchronous pass.
///
/// Convenience for async callers: the parsed tree is created and dropped
/// inside this call.
#[must_use]
pub fn extract_hrefs(html: &str) -> Vec<String> {
    HtmlDocument::parse(html)
        .links()
        .into_iter()
        .map(|link| link.href)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
        <head><title> The   Page
        Title </title></head>
        <body>
            <h1>Main</h1>
            <p>Intro paragraph with enough text.</p>
            <h2> Sub  heading </h2>
            <p>tiny</p>
            <p>© 2024 Example Corp, all rights reserved paragraph.</p>
            <p>This site uses cookies to track you around the web.</p>
            <p>Second real paragraph of content here.</p>
            <a href="/relative">Relative <b>link</b></a>
            <a href="https://other.example/x" rel="nofollow">External</a>
            <a>No href</a>
        </body></html>"#;

    #[test]
    fn title_is_collapsed() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.title(), "The Page Title");
    }

    #[test]
    fn missing_title_is_empty() {
        let doc = HtmlDocument::parse("<html><body></body></html>");
        assert_eq!(doc.title(), "");
    }

    #[test]
    fn headings_in_document_order_with_levels() {
        let doc = HtmlDocument::parse(PAGE);
        let headings = doc.headings();
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0], Heading { level: 1, text: "Main".into() });
        assert_eq!(headings[1], Heading { level: 2, text: "Sub heading".into() });
    }

    #[test]
    fn paragraphs_filter_short_and_boilerplate() {
        let doc = HtmlDocument::parse(PAGE);
        let paragraphs = doc.paragraphs();
        assert_eq!(
            paragraphs,
            vec![
                "Intro paragraph with enough text.".to_string(),
                "Second real paragraph of content here.".to_string(),
            ]
        );
    }

    #[test]
    fn links_carry_href_text_and_rel() {
        let doc = HtmlDocument::parse(PAGE);
        let links = doc.links();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "/relative");
        assert_eq!(links[0].text, "Relative link");
        assert_eq!(links[0].rel, "");
        assert_eq!(links[1].href, "https://other.example/x");
        assert_eq!(links[1].rel, "nofollow");
    }

    #[test]
    fn extract_hrefs_is_a_flat_list() {
        assert_eq!(
            extract_hrefs(PAGE),
            vec!["/relative".to_string(), "https://other.example/x".to_string()]
        );
    }
}
