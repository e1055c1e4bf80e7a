//! Deterministic normalization of search output into one canonical
//! document.
//!
//! Pure transforms, no I/O. Each producer turns one partial source
//! (primary document, extracted article, parsed feed, entities) into a
//! partial [`Document`]; `merge_documents` folds them left to right with
//! fill-only semantics, and `pipeline` finishes by enforcing the canonical
//! invariants: a kind is always set, the title is never empty, and an
//! excerpt is derived from content when missing.

use crate::article::Article;
use crate::feed::Feed;
use crate::query::Intent;
use crate::search::SearchResult;
use crate::types::{
    DocKind, Document, Entity, META_INTENT, Section, SectionRole, SearchDocument,
    collapse_whitespace,
};
use std::collections::HashSet;

/// Maximum characters of a derived excerpt.
const EXCERPT_MAX: usize = 240;

/// Title used when every fallback is empty.
const UNTITLED: &str = "(untitled)";

/// Full normalization pipeline over one search result.
#[must_use]
pub fn pipeline(result: &SearchResult) -> Document {
    let mut partials = Vec::new();
    if let Some(primary) = &result.primary {
        if let Some(doc) = normalize_primary(primary) {
            partials.push(doc);
        }
    }
    if let Some(article) = &result.article {
        if let Some(doc) = normalize_article(article) {
            partials.push(doc);
        }
    }
    if let Some(feed) = &result.feed {
        if let Some(doc) = normalize_feed(feed) {
            partials.push(doc);
        }
    }
    if let Some(doc) = normalize_entities(&result.entities) {
        partials.push(doc);
    }

    let mut merged = merge_documents(partials);

    if result.plan.intent != Intent::Unknown {
        merged
            .metadata
            .entry(META_INTENT.to_string())
            .or_insert_with(|| result.plan.intent.to_string());
    }
    if merged.source_url.is_none() {
        if let Some(url) = &result.plan.url {
            merged.source_url = Some(url.clone());
        }
    }

    dedup_sections(&mut merged);
    finalize(&mut merged);
    merged
}

/// Primary-document producer: kind mapping, trimming, excerpt derivation.
#[must_use]
pub fn normalize_primary(primary: &SearchDocument) -> Option<Document> {
    let mut doc = Document {
        source_url: (!primary.url.trim().is_empty()).then(|| primary.url.trim().to_string()),
        kind: DocKind::parse(&primary.kind),
        title: primary.title.trim().to_string(),
        excerpt: primary.excerpt.trim().to_string(),
        content: primary.content.trim().to_string(),
        ..Document::default()
    };
    for (key, value) in &primary.metadata {
        let value = value.trim();
        if !key.trim().is_empty() && !value.is_empty() {
            doc.metadata.insert(key.trim().to_string(), value.to_string());
        }
    }
    // Excerpt derivation and the title fallback chain run after the merge,
    // so a later partial with a real title can still fill an empty one.
    Some(doc)
}

/// Article producer: one body section, article fields as candidates for
/// the document fields.
#[must_use]
pub fn normalize_article(article: &Article) -> Option<Document> {
    let text = article.text.trim();
    if text.is_empty() {
        return None;
    }
    let mut section = Section::new(SectionRole::Body, text);
    if !article.title.trim().is_empty() {
        section.heading = article.title.trim().to_string();
    }
    Some(Document {
        kind: DocKind::Article,
        title: article.title.trim().to_string(),
        excerpt: article.excerpt.trim().to_string(),
        content: text.to_string(),
        sections: vec![section],
        ..Document::default()
    })
}

/// Feed producer: one `feed_item` section per item.
#[must_use]
pub fn normalize_feed(feed: &Feed) -> Option<Document> {
    if feed.title.is_empty() && feed.items.is_empty() {
        return None;
    }
    let mut sections = Vec::with_capacity(feed.items.len());
    for item in &feed.items {
        let text = if !item.content.is_empty() {
            item.content.clone()
        } else if !item.description.is_empty() {
            item.description.clone()
        } else {
            item.title.clone()
        };
        let mut section = Section::new(SectionRole::FeedItem, text).with_heading(&item.title);
        if !item.link.is_empty() {
            section.meta.insert("link".to_string(), item.link.clone());
        }
        if !item.author.is_empty() {
            section.meta.insert("author".to_string(), item.author.clone());
        }
        if !item.guid.is_empty() {
            section.meta.insert("guid".to_string(), item.guid.clone());
        }
        if let Some(published) = item.published {
            section
                .meta
                .insert("published_unix".to_string(), published.timestamp().to_string());
        }
        if let Some(updated) = item.updated {
            section
                .meta
                .insert("updated_unix".to_string(), updated.timestamp().to_string());
        }
        sections.push(section);
    }
    Some(Document {
        kind: DocKind::Feed,
        title: feed.title.clone(),
        excerpt: feed.description.clone(),
        source_url: (!feed.link.is_empty()).then(|| feed.link.clone()),
        sections,
        ..Document::default()
    })
}

/// Entity producer: one `entity` section per entity.
#[must_use]
pub fn normalize_entities(entities: &[Entity]) -> Option<Document> {
    if entities.is_empty() {
        return None;
    }
    let sections = entities
        .iter()
        .map(|entity| {
            let mut section =
                Section::new(SectionRole::Entity, entity.label.clone()).with_heading(&entity.label);
            section.meta.insert("id".to_string(), entity.id.clone());
            if !entity.url.is_empty() {
                section.meta.insert("url".to_string(), entity.url.clone());
            }
            for (key, value) in &entity.meta {
                section.meta.entry(key.clone()).or_insert_with(|| value.clone());
            }
            section
        })
        .collect();
    Some(Document {
        kind: DocKind::Entity,
        sections,
        ..Document::default()
    })
}

/// Folds partial documents left to right.
///
/// The first partial is the deep-copied base. Later partials upgrade an
/// `unknown` kind, fill empty scalar fields, add only missing metadata
/// keys, and append their sections in order.
#[must_use]
pub fn merge_documents(partials: Vec<Document>) -> Document {
    let mut iter = partials.into_iter();
    let Some(mut base) = iter.next() else {
        return Document::default();
    };

    for partial in iter {
        if base.kind == DocKind::Unknown {
            base.kind = partial.kind;
        }
        if base.source_url.as_deref().is_none_or(str::is_empty) {
            base.source_url = partial.source_url;
        }
        if base.title.is_empty() {
            base.title = partial.title;
        }
        if base.excerpt.is_empty() {
            base.excerpt = partial.excerpt;
        }
        if base.content.is_empty() {
            base.content = partial.content;
        }
        for (key, value) in partial.metadata {
            base.metadata.entry(key).or_insert(value);
        }
        base.sections.extend(partial.sections);
    }
    base
}

/// Removes later sections identical in `(role, heading, text)`.
fn dedup_sections(doc: &mut Document) {
    let mut seen = HashSet::new();
    doc.sections
        .retain(|section| seen.insert((section.role, section.heading.clone(), section.text.clone())));
}

/// Enforces the canonical invariants on a document in place.
fn finalize(doc: &mut Document) {
    if doc.excerpt.is_empty() && !doc.content.is_empty() {
        doc.excerpt = collapse_whitespace(&doc.content)
            .chars()
            .take(EXCERPT_MAX)
            .collect();
    }
    if doc.title.is_empty() {
        doc.title = if !doc.excerpt.is_empty() {
            doc.excerpt.clone()
        } else if let Some(url) = doc.source_url.as_deref().filter(|u| !u.is_empty()) {
            url.to_string()
        } else {
            UNTITLED.to_string()
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::feed::FeedItem;
    use crate::search::PlanInfo;

    fn doc(kind: DocKind, title: &str, content: &str) -> Document {
        Document {
            kind,
            title: title.to_string(),
            content: content.to_string(),
            ..Document::default()
        }
    }

    #[test]
    fn merge_upgrades_kind_and_fills_fields() {
        let a = Document {
            kind: DocKind::Unknown,
            source_url: Some("u".to_string()),
            content: "X".to_string(),
            ..Document::default()
        };
        let b = Document {
            kind: DocKind::Article,
            title: "T".to_string(),
            sections: vec![Section::new(SectionRole::Body, "intro")],
            ..Document::default()
        };
        let mut c = doc(DocKind::Feed, "", "");
        c.metadata.insert("k".to_string(), "v".to_string());

        let merged = merge_documents(vec![a, b, c]);
        assert_eq!(merged.kind, DocKind::Article);
        assert_eq!(merged.title, "T");
        assert_eq!(merged.content, "X");
        assert_eq!(merged.source_url.as_deref(), Some("u"));
        assert_eq!(merged.metadata.get("k").unwrap(), "v");
        assert_eq!(merged.sections.len(), 1);
        assert_eq!(merged.sections[0].text, "intro");
    }

    #[test]
    fn merge_never_overwrites_existing_metadata() {
        let mut a = doc(DocKind::Text, "A", "body");
        a.metadata.insert("shared".to_string(), "from-a".to_string());
        let mut b = doc(DocKind::Text, "B", "other");
        b.metadata.insert("shared".to_string(), "from-b".to_string());
        b.metadata.insert("only-b".to_string(), "v".to_string());

        let merged = merge_documents(vec![a, b]);
        assert_eq!(merged.metadata.get("shared").unwrap(), "from-a");
        assert_eq!(merged.metadata.get("only-b").unwrap(), "v");
    }

    #[test]
    fn merge_appends_sections_in_partial_order() {
        let mut a = doc(DocKind::Text, "A", "");
        a.sections.push(Section::new(SectionRole::Body, "a1"));
        let mut b = doc(DocKind::Text, "B", "");
        b.sections.push(Section::new(SectionRole::Body, "b1"));
        b.sections.push(Section::new(SectionRole::Body, "b2"));

        let merged = merge_documents(vec![a, b]);
        let texts: Vec<&str> = merged.sections.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a1", "b1", "b2"]);
    }

    #[test]
    fn merge_of_nothing_is_default() {
        let merged = merge_documents(Vec::new());
        assert_eq!(merged.kind, DocKind::Unknown);
    }

    fn pipeline_of_primary(primary: SearchDocument) -> Document {
        pipeline(&SearchResult {
            query: "q".to_string(),
            primary: Some(primary),
            ..SearchResult::default()
        })
    }

    #[test]
    fn pipeline_derives_excerpt_and_title_from_content() {
        let doc = pipeline_of_primary(SearchDocument {
            url: "https://h/x".to_string(),
            kind: "html".to_string(),
            content: format!("  {}  ", "long words ".repeat(60)),
            ..SearchDocument::default()
        });
        assert_eq!(doc.kind, DocKind::HtmlPage);
        assert!(!doc.excerpt.is_empty());
        assert!(doc.excerpt.chars().count() <= 240);
        // Title falls back to the derived excerpt.
        assert_eq!(doc.title, doc.excerpt);
    }

    #[test]
    fn title_fallback_chain_reaches_untitled() {
        let doc = pipeline_of_primary(SearchDocument::default());
        assert_eq!(doc.title, "(untitled)");

        let doc = pipeline_of_primary(SearchDocument {
            url: "https://only.url".to_string(),
            ..SearchDocument::default()
        });
        assert_eq!(doc.title, "https://only.url");
    }

    #[test]
    fn metadata_values_are_trimmed_and_non_empty() {
        let mut primary = SearchDocument::default();
        primary.metadata.insert("keep".to_string(), "  padded  ".to_string());
        primary.metadata.insert("drop".to_string(), "   ".to_string());
        let doc = normalize_primary(&primary).unwrap();
        assert_eq!(doc.metadata.get("keep").unwrap(), "padded");
        assert!(!doc.metadata.contains_key("drop"));
    }

    #[test]
    fn article_producer_emits_single_body_section() {
        let article = Article {
            title: "Story".to_string(),
            text: "Body text.".to_string(),
            excerpt: "Body".to_string(),
            ..Article::default()
        };
        let doc = normalize_article(&article).unwrap();
        assert_eq!(doc.kind, DocKind::Article);
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].role, SectionRole::Body);
        assert_eq!(doc.sections[0].heading, "Story");

        assert!(normalize_article(&Article::default()).is_none());
    }

    #[test]
    fn feed_producer_prefers_content_then_description_then_title() {
        let feed = Feed {
            title: "F".to_string(),
            items: vec![
                FeedItem {
                    title: "one".to_string(),
                    content: "full".to_string(),
                    description: "desc".to_string(),
                    ..FeedItem::default()
                },
                FeedItem {
                    title: "two".to_string(),
                    description: "desc".to_string(),
                    ..FeedItem::default()
                },
                FeedItem {
                    title: "three".to_string(),
                    ..FeedItem::default()
                },
            ],
            ..Feed::default()
        };
        let doc = normalize_feed(&feed).unwrap();
        let texts: Vec<&str> = doc.sections.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["full", "desc", "three"]);
        assert!(doc.sections.iter().all(|s| s.role == SectionRole::FeedItem));
    }

    #[test]
    fn feed_item_meta_carries_link_and_times() {
        let feed = Feed {
            title: "F".to_string(),
            items: vec![FeedItem {
                title: "item".to_string(),
                link: "https://x/1".to_string(),
                author: "a".to_string(),
                guid: "g".to_string(),
                published: chrono::DateTime::from_timestamp(1_630_000_000, 0),
                ..FeedItem::default()
            }],
            ..Feed::default()
        };
        let doc = normalize_feed(&feed).unwrap();
        let meta = &doc.sections[0].meta;
        assert_eq!(meta.get("link").unwrap(), "https://x/1");
        assert_eq!(meta.get("published_unix").unwrap(), "1630000000");
        assert!(!meta.contains_key("updated_unix"));
    }

    #[test]
    fn pipeline_injects_intent_and_dedups_sections() {
        let result = SearchResult {
            query: "q".to_string(),
            plan: PlanInfo {
                raw_query: "q".to_string(),
                intent: Intent::News,
                ..PlanInfo::default()
            },
            primary: Some(SearchDocument {
                content: "content".to_string(),
                ..SearchDocument::default()
            }),
            feed: Some(Feed {
                title: "F".to_string(),
                items: vec![
                    FeedItem {
                        title: "dup".to_string(),
                        description: "same".to_string(),
                        ..FeedItem::default()
                    },
                    FeedItem {
                        title: "dup".to_string(),
                        description: "same".to_string(),
                        ..FeedItem::default()
                    },
                ],
                ..Feed::default()
            }),
            ..SearchResult::default()
        };
        let doc = pipeline(&result);
        assert_eq!(doc.metadata.get(META_INTENT).unwrap(), "news");
        // The two identical feed items collapse to one section.
        assert_eq!(doc.sections.len(), 1);
        assert!(!doc.title.is_empty());
    }

    #[test]
    fn pipeline_with_unknown_intent_skips_injection() {
        let result = SearchResult {
            query: "https://h/x".to_string(),
            plan: PlanInfo {
                raw_query: "https://h/x".to_string(),
                intent: Intent::Unknown,
                url: Some("https://h/x".to_string()),
                ..PlanInfo::default()
            },
            ..SearchResult::default()
        };
        let doc = pipeline(&result);
        assert!(!doc.metadata.contains_key(META_INTENT));
        // With nothing else, the plan URL becomes the source and the title.
        assert_eq!(doc.source_url.as_deref(), Some("https://h/x"));
        assert_eq!(doc.title, "https://h/x");
    }

    #[test]
    fn pipeline_merges_primary_article_and_feed() {
        // Partials: A = primary (unknown kind, url, content X),
        // B = article (title T, one body section), C = feed with metadata.
        let result = SearchResult {
            query: "q".to_string(),
            plan: PlanInfo::default(),
            primary: Some(SearchDocument {
                url: "u://x".to_string(),
                kind: "unknown".to_string(),
                content: "X".to_string(),
                ..SearchDocument::default()
            }),
            article: Some(Article {
                title: "T".to_string(),
                text: "intro".to_string(),
                ..Article::default()
            }),
            feed: Some(Feed {
                title: "feed title".to_string(),
                ..Feed::default()
            }),
            ..SearchResult::default()
        };
        let doc = pipeline(&result);
        assert_eq!(doc.kind, DocKind::Article);
        // The article's title fills the primary's empty one at merge time.
        assert_eq!(doc.title, "T");
        assert_eq!(doc.content, "X");
        assert!(doc.sections.iter().any(|s| s.text == "intro"));
    }
}
