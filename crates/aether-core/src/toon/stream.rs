//! Streaming JSONL emission of a TOON document.
//!
//! One JSON object per line: a `doc_start`, an optional `doc_meta`, one
//! `token` event per token with its derived category, and a terminating
//! `doc_end`. Cancellation is checked before every write; the first
//! failed or cancelled write ends the stream.

use super::{Token, TokenType, ToonDocument};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Coarse classification of a token for stream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCategory {
    /// Section boundaries.
    Boundary,
    /// Document content.
    Content,
    /// Document or section metadata.
    Metadata,
    /// Anything else.
    Other,
}

impl TokenCategory {
    /// Derives the category from a token type.
    #[must_use]
    pub const fn of(token_type: TokenType) -> Self {
        match token_type {
            TokenType::SectionStart | TokenType::SectionEnd => Self::Boundary,
            TokenType::Text | TokenType::Heading | TokenType::Title | TokenType::Excerpt => {
                Self::Content
            },
            TokenType::Docinfo | TokenType::Meta => Self::Metadata,
        }
    }
}

/// A token as it appears on the stream, category included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamToken {
    /// Token type.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Derived category.
    pub category: TokenCategory,
    /// Role, when present.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// Text payload, when present.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Attributes, when present.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl From<&Token> for StreamToken {
    fn from(token: &Token) -> Self {
        Self {
            token_type: token.token_type,
            category: TokenCategory::of(token.token_type),
            role: token.role.clone(),
            text: token.text.clone(),
            attrs: token.attrs.clone(),
        }
    }
}

/// One line of the JSONL stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Opens the document.
    DocStart {
        /// Document kind.
        kind: String,
        /// Source URL, possibly empty.
        #[serde(default, skip_serializing_if = "String::is_empty")]
        source_url: String,
        /// Document title.
        #[serde(default)]
        title: String,
        /// Document excerpt.
        #[serde(default, skip_serializing_if = "String::is_empty")]
        excerpt: String,
    },
    /// Document attributes, emitted only when non-empty.
    DocMeta {
        /// Flattened document metadata.
        attrs: BTreeMap<String, String>,
    },
    /// One token.
    Token {
        /// The token with its category.
        token: StreamToken,
    },
    /// Closes the document.
    DocEnd,
}

fn write_event(writer: &mut dyn Write, event: &StreamEvent) -> Result<()> {
    serde_json::to_writer(&mut *writer, event)
        .map_err(|e| Error::Unknown(format!("toon stream write failed: {e}")))?;
    writer
        .write_all(b"\n")
        .map_err(|e| Error::Unknown(format!("toon stream write failed: {e}")))?;
    Ok(())
}

/// Streams a TOON document as JSONL events into `writer`.
pub fn stream(
    ctx: &CancellationToken,
    doc: &ToonDocument,
    writer: &mut dyn Write,
) -> Result<()> {
    let mut emit = |event: &StreamEvent| -> Result<()> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        write_event(writer, event)
    };

    emit(&StreamEvent::DocStart {
        kind: doc.kind.clone(),
        source_url: doc.source_url.clone(),
        title: doc.title.clone(),
        excerpt: doc.excerpt.clone(),
    })?;

    if !doc.attributes.is_empty() {
        emit(&StreamEvent::DocMeta {
            attrs: doc.attributes.clone(),
        })?;
    }

    for token in &doc.tokens {
        emit(&StreamEvent::Token {
            token: StreamToken::from(token),
        })?;
    }

    emit(&StreamEvent::DocEnd)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::toon::ToonBuilder;

    fn sample() -> ToonDocument {
        let mut builder = ToonBuilder::new();
        let mut attrs = BTreeMap::new();
        attrs.insert("kind".to_string(), "feed".to_string());
        builder.docinfo(attrs).unwrap();
        builder.section_start("feed_item", Some("H")).unwrap();
        builder.heading("H").unwrap();
        builder.text("feed_item", "B").unwrap();
        builder.meta("link", "https://x").unwrap();
        builder.section_end("feed_item").unwrap();

        let mut attributes = BTreeMap::new();
        attributes.insert("aether.intent".to_string(), "news".to_string());
        ToonDocument {
            kind: "feed".to_string(),
            title: "T".to_string(),
            attributes,
            tokens: builder.finish().unwrap(),
            ..ToonDocument::default()
        }
    }

    fn events_of(doc: &ToonDocument) -> Vec<StreamEvent> {
        let ctx = CancellationToken::new();
        let mut buffer = Vec::new();
        stream(&ctx, doc, &mut buffer).unwrap();
        String::from_utf8(buffer)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn stream_brackets_with_doc_start_and_doc_end() {
        let events = events_of(&sample());
        assert!(matches!(events.first(), Some(StreamEvent::DocStart { .. })));
        assert!(matches!(events.last(), Some(StreamEvent::DocEnd)));
        let starts = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::DocStart { .. }))
            .count();
        let ends = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::DocEnd))
            .count();
        assert_eq!((starts, ends), (1, 1));
    }

    #[test]
    fn event_order_and_categories_match_grammar() {
        let events = events_of(&sample());
        // doc_start, doc_meta, docinfo, section_start, heading, text, meta,
        // section_end, doc_end.
        assert_eq!(events.len(), 9);
        assert!(matches!(events[1], StreamEvent::DocMeta { .. }));

        let categories: Vec<TokenCategory> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Token { token } => Some(token.category),
                _ => None,
            })
            .collect();
        assert_eq!(
            categories,
            vec![
                TokenCategory::Metadata, // docinfo
                TokenCategory::Boundary, // section_start
                TokenCategory::Content,  // heading
                TokenCategory::Content,  // text
                TokenCategory::Metadata, // meta
                TokenCategory::Boundary, // section_end
            ]
        );
    }

    #[test]
    fn doc_meta_is_omitted_when_attributes_empty() {
        let doc = ToonDocument {
            kind: "text".to_string(),
            ..ToonDocument::default()
        };
        let events = events_of(&doc);
        assert_eq!(events.len(), 2);
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::DocMeta { .. })));
    }

    #[test]
    fn cancelled_context_stops_before_first_write() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let mut buffer = Vec::new();
        let err = stream(&ctx, &sample(), &mut buffer).unwrap_err();
        assert_eq!(err.kind(), "cancelled");
        assert!(buffer.is_empty());
    }

    #[test]
    fn write_failure_ends_the_stream() {
        struct FailingWriter;
        impl Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("sink closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let ctx = CancellationToken::new();
        let err = stream(&ctx, &sample(), &mut FailingWriter).unwrap_err();
        assert_eq!(err.kind(), "unknown");
    }

    #[test]
    fn lines_are_individually_valid_json() {
        let ctx = CancellationToken::new();
        let mut buffer = Vec::new();
        stream(&ctx, &sample(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        for line in text.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("event").is_some());
        }
        assert!(text.starts_with("{\"event\":\"doc_start\""));
    }
}
