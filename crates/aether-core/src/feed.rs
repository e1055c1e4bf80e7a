//! Feed sniffing, parsing, and normalization.
//!
//! The first KiB of the body decides whether the payload is Atom, RSS 2.0,
//! or RSS 1.0 (RDF). All three unmarshal through the same event loop into
//! the normalized [`Feed`] / [`FeedItem`] shape. Timestamps try RFC 1123
//! (with and without numeric zones, via RFC 2822 parsing) and then RFC
//! 3339; anything else is left unset.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

/// How many bytes of the body participate in format sniffing.
const SNIFF_WINDOW: usize = 1024;

/// Recognized feed wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// Atom 1.0 (`<feed>`).
    Atom,
    /// RSS 2.0 (`<rss>`).
    Rss2,
    /// RSS 1.0 / RDF (`<rdf:RDF>`).
    Rss1,
}

/// A normalized feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Feed title.
    pub title: String,
    /// Feed description or subtitle.
    pub description: String,
    /// Feed homepage link.
    pub link: String,
    /// Last update time, when parseable.
    pub updated: Option<DateTime<Utc>>,
    /// Items in document order.
    pub items: Vec<FeedItem>,
}

/// A normalized feed item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Item title.
    pub title: String,
    /// Item link.
    pub link: String,
    /// Short description or summary.
    pub description: String,
    /// Full content when the feed carries it (`content:encoded`, Atom
    /// `<content>`).
    pub content: String,
    /// Author attribution.
    pub author: String,
    /// Publication time, when parseable.
    pub published: Option<DateTime<Utc>>,
    /// Update time, when parseable.
    pub updated: Option<DateTime<Utc>>,
    /// Stable identifier (`guid` / `id`).
    pub guid: String,
}

impl Feed {
    /// Trims surrounding whitespace on every string field.
    pub fn clean(&mut self) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.description);
        trim_in_place(&mut self.link);
        for item in &mut self.items {
            trim_in_place(&mut item.title);
            trim_in_place(&mut item.link);
            trim_in_place(&mut item.description);
            trim_in_place(&mut item.content);
            trim_in_place(&mut item.author);
            trim_in_place(&mut item.guid);
        }
    }
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

/// Sniffs the feed format from the first KiB of the body.
#[must_use]
pub fn detect_format(body: &str) -> Option<FeedFormat> {
    let window: String = body
        .trim_start()
        .chars()
        .take(SNIFF_WINDOW)
        .collect::<String>()
        .to_ascii_lowercase();
    if window.contains("<feed") {
        Some(FeedFormat::Atom)
    } else if window.contains("<rss") {
        Some(FeedFormat::Rss2)
    } else if window.contains("<rdf:rdf") || window.contains("<rdf") {
        Some(FeedFormat::Rss1)
    } else {
        None
    }
}

/// Parses a feed body into the normalized shape.
pub fn parse(body: &str) -> Result<Feed> {
    let format = detect_format(body)
        .ok_or_else(|| Error::Parsing("body does not look like a known feed format".into()))?;
    let mut feed = parse_with_format(body, format)?;
    feed.clean();
    Ok(feed)
}

/// Attempts RFC 1123 with numeric zone, RFC 1123 with zone name (both via
/// RFC 2822 parsing), then RFC 3339.
#[must_use]
pub fn parse_feed_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

#[allow(clippy::too_many_lines)]
fn parse_with_format(body: &str, format: FeedFormat) -> Result<Feed> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut item: Option<FeedItem> = None;
    let mut element: Option<String> = None;
    let mut buf = Vec::new();

    let item_tag = match format {
        FeedFormat::Atom => "entry",
        FeedFormat::Rss2 | FeedFormat::Rss1 => "item",
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if name == item_tag {
                    item = Some(FeedItem::default());
                    element = None;
                } else {
                    if format == FeedFormat::Atom && name == "link" {
                        apply_atom_link(&e, &mut feed, item.as_mut());
                    }
                    element = Some(name);
                }
            },
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if format == FeedFormat::Atom && name == "link" {
                    apply_atom_link(&e, &mut feed, item.as_mut());
                }
            },
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if name == item_tag {
                    if let Some(done) = item.take() {
                        feed.items.push(done);
                    }
                }
                element = None;
            },
            Ok(Event::Text(e)) => {
                if let Some(ref name) = element {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::Parsing(format!("feed xml unescape: {e}")))?;
                    apply_text(&mut feed, item.as_mut(), name, &text, format);
                }
            },
            Ok(Event::CData(e)) => {
                if let Some(ref name) = element {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    apply_text(&mut feed, item.as_mut(), name, &text, format);
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Parsing(format!("feed xml parse error: {e}"))),
            _ => {},
        }
        buf.clear();
    }

    Ok(feed)
}

fn apply_atom_link(
    e: &quick_xml::events::BytesStart<'_>,
    feed: &mut Feed,
    item: Option<&mut FeedItem>,
) {
    let href = e
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"href")
        .map(|a| String::from_utf8_lossy(&a.value).to_string());
    let Some(href) = href else { return };

    // Only the first link is kept, per the normalized shape.
    match item {
        Some(item) if item.link.is_empty() => item.link = href,
        Some(_) => {},
        None if feed.link.is_empty() => feed.link = href,
        None => {},
    }
}

fn append_text(target: &mut String, text: &str) {
    target.push_str(text);
}

fn apply_text(
    feed: &mut Feed,
    item: Option<&mut FeedItem>,
    element: &str,
    text: &str,
    format: FeedFormat,
) {
    if let Some(item) = item {
        match element {
            "title" => append_text(&mut item.title, text),
            "link" if format != FeedFormat::Atom => append_text(&mut item.link, text),
            "description" | "summary" => append_text(&mut item.description, text),
            "content:encoded" | "content" => append_text(&mut item.content, text),
            "author" | "dc:creator" | "name" => {
                if item.author.is_empty() {
                    append_text(&mut item.author, text);
                }
            },
            "pubdate" | "published" | "dc:date" => {
                if item.published.is_none() {
                    item.published = parse_feed_time(text);
                }
            },
            "updated" => item.updated = parse_feed_time(text),
            "guid" | "id" => append_text(&mut item.guid, text),
            _ => {},
        }
    } else {
        match element {
            "title" => append_text(&mut feed.title, text),
            "description" | "subtitle" => append_text(&mut feed.description, text),
            "link" if format != FeedFormat::Atom => append_text(&mut feed.link, text),
            "lastbuilddate" | "pubdate" | "updated" | "dc:date" => {
                if feed.updated.is_none() {
                    feed.updated = parse_feed_time(text);
                }
            },
            _ => {},
        }
    }
}
