//! Token-Oriented Object Notation (TOON).
//!
//! A stable token-stream shape decoupled from the canonical document,
//! built for LLM ingestion. The token grammar is
//!
//! ```text
//! docinfo? title? excerpt? (text | section_start heading? (text | meta)* section_end)*
//! ```
//!
//! and [`ToonBuilder`] refuses out-of-order emission, so every
//! [`ToonDocument`] that leaves this module satisfies the grammar. The
//! header keeps its own `title`/`excerpt` fields alongside the equivalent
//! tokens; both are emitted for compatibility.

mod binary;
mod json;
mod stream;

pub use binary::{decode, encode};
pub use json::{LiteDocument, LiteToken, from_lite_json, to_json, to_json_pretty, to_lite_json};
pub use stream::{StreamEvent, TokenCategory, stream};

use crate::types::Document;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The TOON token alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Document-level information carried in attributes.
    Docinfo,
    /// Document title.
    Title,
    /// Document excerpt.
    Excerpt,
    /// A run of content text.
    Text,
    /// A heading.
    Heading,
    /// Opens a section.
    SectionStart,
    /// Closes a section.
    SectionEnd,
    /// One metadata pair.
    Meta,
}

impl TokenType {
    /// Stable lowercase identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Docinfo => "docinfo",
            Self::Title => "title",
            Self::Excerpt => "excerpt",
            Self::Text => "text",
            Self::Heading => "heading",
            Self::SectionStart => "section_start",
            Self::SectionEnd => "section_end",
            Self::Meta => "meta",
        }
    }
}

/// One token of a TOON stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token type.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Role tag, usually the owning section's role.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// Text payload.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Lower-cased attribute pairs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl Token {
    fn new(token_type: TokenType) -> Self {
        Self {
            token_type,
            role: String::new(),
            text: String::new(),
            attrs: BTreeMap::new(),
        }
    }
}

/// A complete TOON document: header fields plus the token stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToonDocument {
    /// Origin identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    /// Document kind string.
    #[serde(default)]
    pub kind: String,
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Document excerpt.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub excerpt: String,
    /// Flattened document metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Tokens in grammar order.
    #[serde(default)]
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderStage {
    Start,
    AfterDocinfo,
    AfterTitle,
    AfterExcerpt,
    Body,
    InSection,
}

/// Grammar-enforcing token accumulator.
#[derive(Debug)]
pub struct ToonBuilder {
    tokens: Vec<Token>,
    stage: BuilderStage,
    section_role: String,
}

impl Default for ToonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ToonBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            stage: BuilderStage::Start,
            section_role: String::new(),
        }
    }

    fn grammar_error(&self, wanted: &str) -> Error {
        Error::Parsing(format!(
            "toon grammar violation: {wanted} not allowed at stage {:?}",
            self.stage
        ))
    }

    fn lowered(attrs: BTreeMap<String, String>) -> BTreeMap<String, String> {
        attrs
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect()
    }

    /// Emits the optional leading `docinfo` token.
    pub fn docinfo(&mut self, attrs: BTreeMap<String, String>) -> Result<()> {
        if self.stage != BuilderStage::Start {
            return Err(self.grammar_error("docinfo"));
        }
        let mut token = Token::new(TokenType::Docinfo);
        token.attrs = Self::lowered(attrs);
        self.tokens.push(token);
        self.stage = BuilderStage::AfterDocinfo;
        Ok(())
    }

    /// Emits the optional `title` token.
    pub fn title(&mut self, text: &str) -> Result<()> {
        if !matches!(self.stage, BuilderStage::Start | BuilderStage::AfterDocinfo) {
            return Err(self.grammar_error("title"));
        }
        let mut token = Token::new(TokenType::Title);
        token.text = text.to_string();
        self.tokens.push(token);
        self.stage = BuilderStage::AfterTitle;
        Ok(())
    }

    /// Emits the optional `excerpt` token.
    pub fn excerpt(&mut self, text: &str) -> Result<()> {
        if !matches!(
            self.stage,
            BuilderStage::Start | BuilderStage::AfterDocinfo | BuilderStage::AfterTitle
        ) {
            return Err(self.grammar_error("excerpt"));
        }
        let mut token = Token::new(TokenType::Excerpt);
        token.text = text.to_string();
        self.tokens.push(token);
        self.stage = BuilderStage::AfterExcerpt;
        Ok(())
    }

    /// Emits a `text` token, either top-level or inside a section.
    pub fn text(&mut self, role: &str, text: &str) -> Result<()> {
        match self.stage {
            BuilderStage::InSection => {},
            BuilderStage::Start
            | BuilderStage::AfterDocinfo
            | BuilderStage::AfterTitle
            | BuilderStage::AfterExcerpt
            | BuilderStage::Body => self.stage = BuilderStage::Body,
        }
        let mut token = Token::new(TokenType::Text);
        token.role = role.to_string();
        token.text = text.to_string();
        self.tokens.push(token);
        Ok(())
    }

    /// Opens a section.
    pub fn section_start(&mut self, role: &str, heading: Option<&str>) -> Result<()> {
        if self.stage == BuilderStage::InSection {
            return Err(self.grammar_error("section_start"));
        }
        let mut token = Token::new(TokenType::SectionStart);
        token.role = role.to_string();
        if let Some(heading) = heading {
            token
                .attrs
                .insert("heading".to_string(), heading.to_string());
        }
        self.tokens.push(token);
        self.stage = BuilderStage::InSection;
        self.section_role = role.to_string();
        Ok(())
    }

    /// Emits the optional `heading` token directly after `section_start`.
    pub fn heading(&mut self, text: &str) -> Result<()> {
        if self.stage != BuilderStage::InSection {
            return Err(self.grammar_error("heading"));
        }
        // heading is only valid immediately after section_start.
        if self
            .tokens
            .last()
            .is_none_or(|t| t.token_type != TokenType::SectionStart)
        {
            return Err(self.grammar_error("heading"));
        }
        let mut token = Token::new(TokenType::Heading);
        token.role = self.section_role.clone();
        token.text = text.to_string();
        self.tokens.push(token);
        Ok(())
    }

    /// Emits one `meta` token for a key/value pair inside a section.
    pub fn meta(&mut self, key: &str, value: &str) -> Result<()> {
        if self.stage != BuilderStage::InSection {
            return Err(self.grammar_error("meta"));
        }
        let mut token = Token::new(TokenType::Meta);
        token.role = self.section_role.clone();
        token
            .attrs
            .insert(key.to_ascii_lowercase(), value.to_string());
        self.tokens.push(token);
        Ok(())
    }

    /// Closes the open section.
    pub fn section_end(&mut self, role: &str) -> Result<()> {
        if self.stage != BuilderStage::InSection {
            return Err(self.grammar_error("section_end"));
        }
        let mut token = Token::new(TokenType::SectionEnd);
        token.role = role.to_string();
        self.tokens.push(token);
        self.stage = BuilderStage::Body;
        self.section_role.clear();
        Ok(())
    }

    /// Finishes the build. Fails when a section is left open.
    pub fn finish(self) -> Result<Vec<Token>> {
        if self.stage == BuilderStage::InSection {
            return Err(Error::Parsing(
                "toon grammar violation: unclosed section".into(),
            ));
        }
        Ok(self.tokens)
    }
}

impl ToonDocument {
    /// Converts a canonical document into its TOON form.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let mut builder = ToonBuilder::new();

        let mut docinfo = BTreeMap::new();
        docinfo.insert("kind".to_string(), doc.kind.to_string());
        builder.docinfo(docinfo)?;

        if !doc.title.is_empty() {
            builder.title(&doc.title)?;
        }
        if !doc.excerpt.is_empty() {
            builder.excerpt(&doc.excerpt)?;
        }

        if doc.sections.is_empty() {
            if !doc.content.is_empty() {
                builder.text("content", &doc.content)?;
            }
        } else {
            for section in &doc.sections {
                let role = section.role.as_str();
                let heading = (!section.heading.is_empty()).then_some(section.heading.as_str());
                builder.section_start(role, heading)?;
                if let Some(heading) = heading {
                    builder.heading(heading)?;
                }
                if !section.text.is_empty() {
                    builder.text(role, &section.text)?;
                }
                for (key, value) in &section.meta {
                    builder.meta(key, value)?;
                }
                builder.section_end(role)?;
            }
        }

        Ok(Self {
            source_url: doc.source_url.clone().unwrap_or_default(),
            kind: doc.kind.to_string(),
            title: doc.title.clone(),
            excerpt: doc.excerpt.clone(),
            attributes: doc.metadata.clone(),
            tokens: builder.finish()?,
        })
    }
}
