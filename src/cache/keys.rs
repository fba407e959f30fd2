//! Cache keys, content tags and invalidation actions.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A content dependency recorded while rendering a response.
///
/// Tags follow the CMS naming: `pages`, `navigation`, `page:{slug}`, the bare
/// collection slug, `collection:{slug}` and `item:{collection}:{item}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn pages() -> Self {
        Self::new("pages")
    }

    pub fn navigation() -> Self {
        Self::new("navigation")
    }

    pub fn page(slug: &str) -> Self {
        Self(format!("page:{slug}"))
    }

    /// The bare collection slug, which is what collection webhooks name.
    pub fn collection(slug: &str) -> Self {
        Self::new(slug)
    }

    pub fn collection_scope(slug: &str) -> Self {
        Self(format!("collection:{slug}"))
    }

    pub fn item(collection: &str, item: &str) -> Self {
        Self(format!("item:{collection}:{item}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one stored response variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub path: String,
    pub query_hash: u64,
}

impl ResponseKey {
    pub fn new(path: impl Into<String>, query: &str) -> Self {
        Self {
            path: path.into(),
            query_hash: hash_query(query),
        }
    }

    /// True when the key's path equals `prefix` or lives below it.
    pub fn is_under(&self, prefix: &str) -> bool {
        if prefix == "/" {
            return true;
        }
        let prefix = prefix.trim_end_matches('/');
        self.path == prefix
            || self
                .path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// One cache action requested by a revalidation webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// Drop the rendered page at this path.
    Path(String),
    /// Drop every response that depends on this tag.
    Tag(CacheTag),
    /// Drop the shared layout at this path and everything rendered beneath it.
    Layout(String),
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalidation::Path(path) => f.write_str(path),
            Invalidation::Tag(tag) => write!(f, "tag:{tag}"),
            Invalidation::Layout(path) => write!(f, "{path} (layout)"),
        }
    }
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash a query string for response cache keys.
pub fn hash_query(query: &str) -> u64 {
    hash_value(&query)
}
