//! Crawl frontier and visited set.
//!
//! Both structures are mutex-guarded so a future multi-worker crawl can
//! share them without contract changes. URL canonicalization lives here
//! because both the frontier and the visited set key on canonical form.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use url::Url;

/// One queued crawl target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    /// Canonical URL to fetch.
    pub url: String,
    /// Depth from the crawl root.
    pub depth: usize,
}

/// FIFO queue of pending crawl targets.
#[derive(Debug, Default)]
pub struct Frontier {
    items: Mutex<VecDeque<FrontierItem>>,
}

impl Frontier {
    /// Creates an empty frontier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item; empty URLs are ignored.
    pub fn enqueue(&self, url: &str, depth: usize) {
        if url.is_empty() {
            return;
        }
        if let Ok(mut items) = self.items.lock() {
            items.push_back(FrontierItem {
                url: url.to_string(),
                depth,
            });
        }
    }

    /// Removes and returns the oldest item, or `None` when empty.
    pub fn dequeue(&self) -> Option<FrontierItem> {
        self.items.lock().ok()?.pop_front()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Monotonically growing set of canonical URLs seen this run.
#[derive(Debug, Default)]
pub struct Visited {
    urls: Mutex<HashSet<String>>,
}

impl Visited {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a URL; returns true iff it was newly inserted.
    pub fn mark(&self, url: &str) -> bool {
        self.urls
            .lock()
            .map(|mut urls| urls.insert(url.to_string()))
            .unwrap_or(false)
    }

    /// Number of URLs seen.
    pub fn len(&self) -> usize {
        self.urls.lock().map(|urls| urls.len()).unwrap_or(0)
    }

    /// True when no URL has been seen.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Canonicalizes a possibly-relative URL against an optional base.
///
/// Only `http` and `https` survive; the host is lowercased by the URL
/// parser and the fragment is dropped.
#[must_use]
pub fn canonicalize(raw: &str, base: Option<&Url>) -> Option<Url> {
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(raw).ok()?,
        Err(_) => return None,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn frontier_is_fifo() {
        let frontier = Frontier::new();
        frontier.enqueue("https://h/1", 0);
        frontier.enqueue("https://h/2", 1);
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.dequeue().unwrap().url, "https://h/1");
        assert_eq!(frontier.dequeue().unwrap().depth, 1);
        assert!(frontier.dequeue().is_none());
    }

    #[test]
    fn frontier_ignores_empty_urls() {
        let frontier = Frontier::new();
        frontier.enqueue("", 0);
        assert!(frontier.is_empty());
    }

    #[test]
    fn visited_marks_only_once() {
        let visited = Visited::new();
        assert!(visited.mark("https://h/"));
        assert!(!visited.mark("https://h/"));
        assert!(visited.mark("https://h/other"));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn canonicalize_enforces_scheme() {
        assert!(canonicalize("https://h/x", None).is_some());
        assert!(canonicalize("http://h/x", None).is_some());
        assert!(canonicalize("ftp://h/x", None).is_none());
        assert!(canonicalize("mailto:a@b", None).is_none());
        assert!(canonicalize("javascript:void(0)", None).is_none());
    }

    #[test]
    fn canonicalize_lowercases_host_and_strips_fragment() {
        let url = canonicalize("https://EXAMPLE.com/Path#frag", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/Path");
    }

    #[test]
    fn canonicalize_resolves_relative_against_base() {
        let base = Url::parse("https://h.example/dir/page.html").unwrap();
        let url = canonicalize("../other", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "https://h.example/other");
        // Relative with no base is rejected.
        assert!(canonicalize("/rooted", None).is_none());
    }
}
