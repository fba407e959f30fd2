//! The seam between the resolver and the places content can come from.

use std::fmt;

use async_trait::async_trait;
use cmsfront_types::{
    Collection, CollectionItem, CollectionItemSummary, NavigationItem, Page, PageSummary,
};

/// Where a resolved piece of content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentOrigin {
    Kv,
    Api,
    Static,
}

impl ContentOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentOrigin::Kv => "kv",
            ContentOrigin::Api => "api",
            ContentOrigin::Static => "static",
        }
    }
}

impl fmt::Display for ContentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value together with the source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub origin: ContentOrigin,
}

impl<T> Resolved<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            value: f(self.value),
            origin: self.origin,
        }
    }
}

/// One link in the resolver chain.
///
/// Implementations absorb their own failures: a store that cannot be reached
/// answers `None` or an empty list so the next source gets its turn.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn origin(&self) -> ContentOrigin;

    async fn page(&self, slug: &str, locale: &str) -> Option<Page>;

    async fn pages(&self) -> Vec<PageSummary>;

    async fn navigation(&self) -> Vec<NavigationItem>;

    async fn collection(&self, slug: &str) -> Option<Collection>;

    async fn collection_items(&self, collection: &str) -> Vec<CollectionItemSummary>;

    async fn collection_item(&self, collection: &str, item: &str) -> Option<CollectionItem>;
}
