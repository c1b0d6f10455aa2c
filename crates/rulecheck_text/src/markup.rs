//! Markup preprocessing pass
//!
//! Fixtures anchor expected diagnostics with inline spans instead of
//! hard-coded coordinates: `{|#0: some text |}` marks the delimited region
//! with key 0. This pass strips the delimiters and records, for every key,
//! the span the region occupies in the stripped text. `|}` always closes
//! the innermost open `{|#K:`, so nested and adjacent spans are
//! unambiguous.

use memchr::memchr2;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::Span;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("markup span key #{key} declared more than once")]
    DuplicateKey { key: u32 },
    #[error("unbalanced markup delimiter at byte {offset}")]
    Unbalanced { offset: usize },
    #[error("malformed markup opener at byte {offset}: expected `{{|#<key>:`")]
    Malformed { offset: usize },
}

/// A fixture after markup stripping: plain source plus a key-to-span table
///
/// The recorded spans are offsets into [`MarkupFixture::source`], i.e. the
/// exact text handed to an analyzer.
#[derive(Debug, Clone)]
pub struct MarkupFixture {
    source: String,
    spans: FxHashMap<u32, Span>,
    keys: Vec<u32>,
}

impl MarkupFixture {
    /// Strip markup delimiters from raw fixture text
    ///
    /// Only `{|#<digits>:` opens a span; a lone `{|` is treated as literal
    /// text. A closer without a matching opener, an opener never closed,
    /// and a reused key are all hard errors.
    pub fn parse(raw: &str) -> Result<Self, MarkupError> {
        let bytes = raw.as_bytes();
        let mut source = String::with_capacity(raw.len());
        let mut open: Vec<(u32, u32)> = Vec::new();
        let mut spans = FxHashMap::default();
        let mut seen = FxHashSet::default();
        let mut keys = Vec::new();

        let mut pos = 0;
        while pos < bytes.len() {
            let Some(rel) = memchr2(b'{', b'|', &bytes[pos..]) else {
                source.push_str(&raw[pos..]);
                break;
            };
            let at = pos + rel;
            source.push_str(&raw[pos..at]);

            if bytes[at] == b'{' && raw[at..].starts_with("{|#") {
                let key_start = at + 3;
                let mut cursor = key_start;
                while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
                    cursor += 1;
                }
                if cursor == key_start || cursor >= bytes.len() || bytes[cursor] != b':' {
                    return Err(MarkupError::Malformed { offset: at });
                }
                let key: u32 = raw[key_start..cursor]
                    .parse()
                    .map_err(|_| MarkupError::Malformed { offset: at })?;
                if !seen.insert(key) {
                    return Err(MarkupError::DuplicateKey { key });
                }
                open.push((key, source.len() as u32));
                keys.push(key);
                pos = cursor + 1;
            } else if bytes[at] == b'|' && bytes.get(at + 1) == Some(&b'}') {
                let Some((key, start)) = open.pop() else {
                    return Err(MarkupError::Unbalanced { offset: at });
                };
                spans.insert(key, Span::new(start, source.len() as u32));
                pos = at + 2;
            } else {
                source.push(bytes[at] as char);
                pos = at + 1;
            }
        }

        if !open.is_empty() {
            return Err(MarkupError::Unbalanced { offset: raw.len() });
        }

        Ok(Self { source, spans, keys })
    }

    /// The markup-free source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Resolve a markup key to its span in the stripped text
    pub fn span(&self, key: u32) -> Option<Span> {
        self.spans.get(&key).copied()
    }

    /// Declared keys, in order of appearance
    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }
}
