//! Cache key grammar.
//!
//! Keys are colon-delimited ASCII strings of the form
//! `context:type:identifier[:subtype][:qualifier...]`: at least three
//! non-empty segments, at most 512 bytes total. The first segment names the
//! bounded domain that owns the entry, the second the cache category, the
//! rest identify the entity or query parameters.
//!
//! Keys are pure functions of the query type name and its parameters.
//! Construct them through the builders here; the builders skip empty
//! segments, so their output satisfies [`is_valid`] whenever the total
//! length stays within [`MAX_KEY_LENGTH`].

use std::fmt;

/// Keys owned by the public website.
pub const CONTEXT_WEBSITE: &str = "website";
/// Keys owned by the headless API surface.
pub const CONTEXT_API: &str = "api";
/// Keys shared across surfaces.
pub const CONTEXT_SHARED: &str = "shared";

/// Maximum total key length in bytes.
pub const MAX_KEY_LENGTH: usize = 512;

const SEPARATOR: char = ':';
const MIN_SEGMENTS: usize = 3;
const TYPE_QUERY: &str = "query";

/// An immutable cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build a key for a read query: `website:query:{name}[:param...]`.
///
/// With no parameters the key has exactly three segments.
pub fn query_key(query_name: &str, params: &[&str]) -> CacheKey {
    key_with(CONTEXT_WEBSITE, TYPE_QUERY, query_name, params)
}

/// Build a three-segment key.
pub fn key(context: &str, kind: &str, identifier: &str) -> CacheKey {
    key_with(context, kind, identifier, &[])
}

/// Build a key with trailing qualifier segments. Empty qualifiers are
/// skipped so the result always splits into non-empty segments.
pub fn key_with(context: &str, kind: &str, identifier: &str, qualifiers: &[&str]) -> CacheKey {
    let mut raw = String::with_capacity(
        context.len() + kind.len() + identifier.len() + qualifiers.len() * 8 + 2,
    );
    raw.push_str(context);
    raw.push(SEPARATOR);
    raw.push_str(kind);
    raw.push(SEPARATOR);
    raw.push_str(identifier);
    for qualifier in qualifiers {
        if qualifier.is_empty() {
            continue;
        }
        raw.push(SEPARATOR);
        raw.push_str(qualifier);
    }
    CacheKey(raw)
}

/// Whether a raw string satisfies the key grammar.
pub fn is_valid(key: &str) -> bool {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return false;
    }
    let mut segments = 0;
    for segment in key.split(SEPARATOR) {
        if segment.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments >= MIN_SEGMENTS
}

/// First segment of a key, or `""` when absent. Never panics.
pub fn context_of(key: &str) -> &str {
    segment(key, 0)
}

/// Second segment of a key, or `""` when absent.
pub fn type_of(key: &str) -> &str {
    segment(key, 1)
}

/// Third segment of a key, or `""` when absent.
pub fn identifier_of(key: &str) -> &str {
    segment(key, 2)
}

fn segment(key: &str, index: usize) -> &str {
    key.split(SEPARATOR).nth(index).unwrap_or("")
}
