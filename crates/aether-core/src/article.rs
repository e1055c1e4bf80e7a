//! Readability-style article extraction.
//!
//! Scoring walks the parsed tree by node id. The tree is an arena, so
//! "pruning" is a membership set rather than node surgery, and parent and
//! grandparent credit is a map update. Candidate iteration follows source
//! order, and score ties keep the first occurrence, so extraction is
//! deterministic for a given input.

use crate::html::HtmlDocument;
use crate::types::collapse_whitespace;
use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{HashMap, HashSet};

/// Tags removed wholesale before scoring.
const PRUNE_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "footer", "nav", "aside", "header", "form",
];

/// Class/id fragments that mark an element as boilerplate.
const PRUNE_HINTS: &[&str] = &["comment", "footer", "sidebar", "nav", "menu", "advert", "ad-"];

/// Tags eligible to accumulate a score.
const CANDIDATE_TAGS: &[&str] = &["p", "td", "pre", "article", "section", "div", "li"];

/// Tags kept when assembling the extracted content node.
const CONTENT_TAGS: &[&str] = &[
    "p", "div", "article", "section", "ul", "ol", "li", "img", "figure", "h1", "h2", "h3", "h4",
    "h5", "h6",
];

/// Minimum candidate text length.
const MIN_CANDIDATE_TEXT: usize = 50;

/// Maximum excerpt length in characters.
const EXCERPT_MAX: usize = 240;

/// Result of article extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    /// Best-effort article title.
    pub title: String,
    /// Author attribution, when discoverable.
    pub byline: String,
    /// HTML of the selected content subtree.
    pub content_html: String,
    /// Plain text of the selected content.
    pub text: String,
    /// Short summary derived from the text.
    pub excerpt: String,
    /// Lead image, when one is declared.
    pub top_image_url: String,
}

/// Extracts the main article content from an HTML page.
#[must_use]
pub fn extract(html: &str) -> Article {
    let document = HtmlDocument::parse(html);
    extract_from(&document)
}

/// Extracts from an already-parsed document.
#[must_use]
pub fn extract_from(document: &HtmlDocument) -> Article {
    let tree = document.tree();
    let root = body_or_root(tree);
    let pruned = pruned_nodes(root);

    let scores = score_candidates(root, &pruned);
    let top = top_candidate(root, &scores);

    let (content_html, text) = match top {
        Some(id) => assemble_content(tree, id, &pruned),
        None => {
            let text = subtree_text(root, &pruned);
            (String::new(), text)
        },
    };

    let meta = document.meta();
    let title = if meta.get("title").is_some_and(|t| !t.is_empty()) {
        meta.get("title").cloned().unwrap_or_default()
    } else {
        document
            .headings()
            .first()
            .map(|h| h.text.clone())
            .unwrap_or_default()
    };

    let excerpt = excerpt_of(&text);

    Article {
        title,
        byline: find_byline(tree, &meta),
        content_html,
        text,
        excerpt,
        top_image_url: find_top_image(tree, &meta),
    }
}

fn body_or_root(tree: &Html) -> NodeRef<'_, Node> {
    #[allow(clippy::unwrap_used)] // static selector
    let body = Selector::parse("body").unwrap();
    tree.select(&body)
        .next()
        .map_or_else(|| tree.tree.root(), |el| *el)
}

fn element_tag(node: NodeRef<'_, Node>) -> Option<String> {
    node.value()
        .as_element()
        .map(|el| el.name().to_ascii_lowercase())
}

fn is_pruned_element(node: NodeRef<'_, Node>) -> bool {
    let Some(element) = node.value().as_element() else {
        return false;
    };
    let tag = element.name().to_ascii_lowercase();
    if PRUNE_TAGS.contains(&tag.as_str()) {
        return true;
    }
    let mut hint = element.attr("class").unwrap_or_default().to_ascii_lowercase();
    hint.push_str(&element.attr("id").unwrap_or_default().to_ascii_lowercase());
    PRUNE_HINTS.iter().any(|needle| hint.contains(needle))
}

/// Collects every node inside a pruned subtree.
fn pruned_nodes(root: NodeRef<'_, Node>) -> HashSet<NodeId> {
    let mut pruned = HashSet::new();
    for node in root.descendants() {
        if pruned.contains(&node.id()) {
            continue;
        }
        if is_pruned_element(node) {
            for inner in node.descendants() {
                pruned.insert(inner.id());
            }
        }
    }
    pruned
}

/// Collapsed text of a subtree, skipping pruned nodes.
fn subtree_text(node: NodeRef<'_, Node>, pruned: &HashSet<NodeId>) -> String {
    let mut out = String::new();
    for inner in node.descendants() {
        if pruned.contains(&inner.id()) {
            continue;
        }
        if let Node::Text(text) = inner.value() {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

/// Collapsed text contained within `<a>` descendants of a subtree.
fn link_text_len(node: NodeRef<'_, Node>, pruned: &HashSet<NodeId>) -> usize {
    let mut total = 0;
    for inner in node.descendants() {
        if pruned.contains(&inner.id()) {
            continue;
        }
        if element_tag(inner).as_deref() == Some("a") {
            total += subtree_text(inner, pruned).chars().count();
        }
    }
    total
}

fn score_candidates(
    root: NodeRef<'_, Node>,
    pruned: &HashSet<NodeId>,
) -> HashMap<NodeId, f64> {
    let mut scores: HashMap<NodeId, f64> = HashMap::new();

    for node in root.descendants() {
        if pruned.contains(&node.id()) {
            continue;
        }
        let Some(tag) = element_tag(node) else {
            continue;
        };
        if !CANDIDATE_TAGS.contains(&tag.as_str()) {
            continue;
        }
        let text = subtree_text(node, pruned);
        if text.chars().count() < MIN_CANDIDATE_TEXT {
            continue;
        }

        let base: f64 = match tag.as_str() {
            "div" | "article" | "section" => 5.0,
            _ => 3.0,
        };
        #[allow(clippy::cast_precision_loss)]
        let score = base
            + text.chars().count() as f64 / 100.0
            + text.matches(',').count() as f64;

        *scores.entry(node.id()).or_default() += score;
        if let Some(parent) = node.parent() {
            *scores.entry(parent.id()).or_default() += score * 0.5;
            if let Some(grandparent) = parent.parent() {
                *scores.entry(grandparent.id()).or_default() += score * 0.25;
            }
        }
    }

    // Penalize link-heavy nodes: score *= (1 - link_density).
    let adjusted: Vec<(NodeId, f64)> = root
        .descendants()
        .filter_map(|node| {
            let score = *scores.get(&node.id())?;
            let total = subtree_text(node, pruned).chars().count();
            if total == 0 {
                return Some((node.id(), 0.0));
            }
            #[allow(clippy::cast_precision_loss)]
            let density = link_text_len(node, pruned) as f64 / total as f64;
            Some((node.id(), score * (1.0 - density)))
        })
        .collect();
    for (id, score) in adjusted {
        scores.insert(id, score);
    }
    scores
}

/// Highest-scoring node in document order; first occurrence wins ties.
fn top_candidate(
    root: NodeRef<'_, Node>,
    scores: &HashMap<NodeId, f64>,
) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for node in root.descendants() {
        let Some(&score) = scores.get(&node.id()) else {
            continue;
        };
        if score <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {},
            _ => best = Some((node.id(), score)),
        }
    }
    best.map(|(id, _)| id)
}

/// Builds the extracted content: the candidate's tag wrapping its direct
/// children that are non-empty text or content-tag elements.
fn assemble_content(
    tree: &Html,
    candidate: NodeId,
    pruned: &HashSet<NodeId>,
) -> (String, String) {
    let Some(node) = tree.tree.get(candidate) else {
        return (String::new(), String::new());
    };
    let tag = element_tag(node).unwrap_or_else(|| "div".to_string());

    let mut inner_html = String::new();
    let mut text = String::new();
    for child in node.children() {
        if pruned.contains(&child.id()) {
            continue;
        }
        match child.value() {
            Node::Text(t) => {
                if !t.trim().is_empty() {
                    inner_html.push_str(t);
                    text.push_str(t);
                    text.push(' ');
                }
            },
            Node::Element(_) => {
                let child_tag = element_tag(child).unwrap_or_default();
                if CONTENT_TAGS.contains(&child_tag.as_str()) {
                    if let Some(el) = ElementRef::wrap(child) {
                        inner_html.push_str(&el.html());
                    }
                    text.push_str(&subtree_text(child, pruned));
                    text.push(' ');
                }
            },
            _ => {},
        }
    }

    let content_html = format!("<{tag}>{inner_html}</{tag}>");
    (content_html, collapse_whitespace(&text))
}

/// First 240 characters, cut at the last space at or past character 80,
/// with an ellipsis. Shorter text passes through untouched.
#[must_use]
pub fn excerpt_of(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= EXCERPT_MAX {
        return text.to_string();
    }
    let window: String = chars[..EXCERPT_MAX].iter().collect();
    let cut = window
        .char_indices()
        .filter(|&(i, c)| c == ' ' && window[..i].chars().count() >= 80)
        .map(|(i, _)| i)
        .next_back()
        .unwrap_or(window.len());
    let mut out = window[..cut].trim_end().to_string();
    out.push('…');
    out
}

fn find_byline(tree: &Html, meta: &std::collections::BTreeMap<String, String>) -> String {
    if let Some(author) = meta.get("author") {
        return author.clone();
    }
    #[allow(clippy::unwrap_used)]
    let byline = Selector::parse("[class*=byline], [rel=author]").unwrap();
    tree.select(&byline)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

fn find_top_image(tree: &Html, meta: &std::collections::BTreeMap<String, String>) -> String {
    if let Some(image) = meta.get("og:image") {
        return image.clone();
    }
    #[allow(clippy::unwrap_used)]
    let img = Selector::parse("img[src]").unwrap();
    tree.select(&img)
        .next()
        .and_then(|el| el.value().attr("src"))
        .unwrap_or_default()
        .to_string()
}
