//! BTON v1: the binary packing of a TOON document.
//!
//! Layout, all integers little-endian u32, all strings length-prefixed raw
//! bytes:
//!
//! ```text
//! "BTON\0"
//! source_url kind title excerpt          (header strings)
//! attr_count (key value)*                (document attributes)
//! token_count
//!   [type_tag u8] role text attr_count (key value)*   (per token)
//! ```
//!
//! The decoder validates the magic and maps unknown type tags to `text`,
//! so newer writers degrade instead of breaking older readers.

use super::{Token, TokenType, ToonDocument};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Magic prefix of every BTON payload.
pub const MAGIC: &[u8; 5] = b"BTON\0";

const fn type_tag(token_type: TokenType) -> u8 {
    match token_type {
        TokenType::Docinfo => 0,
        TokenType::Title => 1,
        TokenType::Excerpt => 2,
        TokenType::Text => 3,
        TokenType::Heading => 4,
        TokenType::SectionStart => 5,
        TokenType::SectionEnd => 6,
        TokenType::Meta => 7,
    }
}

const fn tag_type(tag: u8) -> TokenType {
    match tag {
        0 => TokenType::Docinfo,
        1 => TokenType::Title,
        2 => TokenType::Excerpt,
        4 => TokenType::Heading,
        5 => TokenType::SectionStart,
        6 => TokenType::SectionEnd,
        7 => TokenType::Meta,
        // 3 and anything unknown decode as text.
        _ => TokenType::Text,
    }
}

fn put_u32(out: &mut Vec<u8>, value: usize) {
    let value = u32::try_from(value).unwrap_or(u32::MAX);
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_string(out: &mut Vec<u8>, value: &str) {
    put_u32(out, value.len());
    out.extend_from_slice(value.as_bytes());
}

fn put_attrs(out: &mut Vec<u8>, attrs: &BTreeMap<String, String>) {
    put_u32(out, attrs.len());
    for (key, value) in attrs {
        put_string(out, key);
        put_string(out, value);
    }
}

/// Encodes a TOON document into BTON bytes.
#[must_use]
pub fn encode(doc: &ToonDocument) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + doc.tokens.len() * 32);
    out.extend_from_slice(MAGIC);

    put_string(&mut out, &doc.source_url);
    put_string(&mut out, &doc.kind);
    put_string(&mut out, &doc.title);
    put_string(&mut out, &doc.excerpt);
    put_attrs(&mut out, &doc.attributes);

    put_u32(&mut out, doc.tokens.len());
    for token in &doc.tokens {
        out.push(type_tag(token.token_type));
        put_string(&mut out, &token.role);
        put_string(&mut out, &token.text);
        put_attrs(&mut out, &token.attrs);
    }
    out
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::Parsing("bton payload truncated".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::Parsing("bton string is not valid utf-8".into()))
    }

    fn attrs(&mut self) -> Result<BTreeMap<String, String>> {
        let count = self.u32()? as usize;
        let mut attrs = BTreeMap::new();
        for _ in 0..count {
            let key = self.string()?;
            let value = self.string()?;
            attrs.insert(key, value);
        }
        Ok(attrs)
    }
}

/// Decodes BTON bytes back into a TOON document.
pub fn decode(bytes: &[u8]) -> Result<ToonDocument> {
    let mut cursor = Cursor { bytes, pos: 0 };

    let magic = cursor.take(MAGIC.len())?;
    if magic != MAGIC {
        return Err(Error::Parsing("bton magic mismatch".into()));
    }

    let source_url = cursor.string()?;
    let kind = cursor.string()?;
    let title = cursor.string()?;
    let excerpt = cursor.string()?;
    let attributes = cursor.attrs()?;

    let token_count = cursor.u32()? as usize;
    let mut tokens = Vec::with_capacity(token_count.min(4096));
    for _ in 0..token_count {
        let tag = cursor.u8()?;
        let role = cursor.string()?;
        let text = cursor.string()?;
        let attrs = cursor.attrs()?;
        tokens.push(Token {
            token_type: tag_type(tag),
            role,
            text,
            attrs,
        });
    }

    Ok(ToonDocument {
        source_url,
        kind,
        title,
        excerpt,
        attributes,
        tokens,
    })
}
