//! JSON serializations of TOON documents: the full shape and the
//! single-letter "Lite" variant for space-sensitive storage.

use super::{Token, TokenType, ToonDocument};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compact JSON encoding of the full TOON shape.
pub fn to_json(doc: &ToonDocument) -> Result<String> {
    serde_json::to_string(doc).map_err(|e| Error::Parsing(format!("toon json encode: {e}")))
}

/// Pretty-printed JSON encoding of the full TOON shape.
pub fn to_json_pretty(doc: &ToonDocument) -> Result<String> {
    serde_json::to_string_pretty(doc).map_err(|e| Error::Parsing(format!("toon json encode: {e}")))
}

/// Lite token: `{t, r, x, a}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteToken {
    /// Token type.
    pub t: TokenType,
    /// Role.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub r: String,
    /// Text payload.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub x: String,
    /// Attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub a: BTreeMap<String, String>,
}

/// Lite document: `{u, k, t, e, a, n}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiteDocument {
    /// Source URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub u: String,
    /// Kind.
    #[serde(default)]
    pub k: String,
    /// Title.
    #[serde(default)]
    pub t: String,
    /// Excerpt.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub e: String,
    /// Attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub a: BTreeMap<String, String>,
    /// Tokens.
    #[serde(default)]
    pub n: Vec<LiteToken>,
}

impl From<&ToonDocument> for LiteDocument {
    fn from(doc: &ToonDocument) -> Self {
        Self {
            u: doc.source_url.clone(),
            k: doc.kind.clone(),
            t: doc.title.clone(),
            e: doc.excerpt.clone(),
            a: doc.attributes.clone(),
            n: doc
                .tokens
                .iter()
                .map(|token| LiteToken {
                    t: token.token_type,
                    r: token.role.clone(),
                    x: token.text.clone(),
                    a: token.attrs.clone(),
                })
                .collect(),
        }
    }
}

impl From<LiteDocument> for ToonDocument {
    fn from(lite: LiteDocument) -> Self {
        Self {
            source_url: lite.u,
            kind: lite.k,
            title: lite.t,
            excerpt: lite.e,
            attributes: lite.a,
            tokens: lite
                .n
                .into_iter()
                .map(|token| Token {
                    token_type: token.t,
                    role: token.r,
                    text: token.x,
                    attrs: token.a,
                })
                .collect(),
        }
    }
}

/// Encodes the Lite (single-letter field) JSON variant.
pub fn to_lite_json(doc: &ToonDocument) -> Result<String> {
    serde_json::to_string(&LiteDocument::from(doc))
        .map_err(|e| Error::Parsing(format!("toon lite encode: {e}")))
}

/// Decodes the Lite JSON variant back into a full TOON document.
pub fn from_lite_json(json: &str) -> Result<ToonDocument> {
    let lite: LiteDocument =
        serde_json::from_str(json).map_err(|e| Error::Parsing(format!("toon lite decode: {e}")))?;
    Ok(lite.into())
}
