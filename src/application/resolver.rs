//! Ordered lookup across the configured content sources.

use std::sync::Arc;

use cmsfront_types::{
    Collection, CollectionItem, CollectionItemSummary, ContentStatus, NavigationItem, Page,
    PageSummary,
};
use futures::future::BoxFuture;
use metrics::counter;
use tracing::{debug, instrument};

use crate::application::sources::{ContentOrigin, ContentSource, Resolved};
use crate::cache::{CacheTag, deps};

/// Asks each source in turn and returns the first usable answer.
///
/// The chain is fixed at construction: the KV snapshot when configured, then
/// the CMS API when configured, then the bundled static content. A source's
/// answer is used whole; results from different sources are never merged.
pub struct ContentResolver {
    sources: Vec<Arc<dyn ContentSource>>,
    default_locale: String,
}

impl ContentResolver {
    pub fn new(sources: Vec<Arc<dyn ContentSource>>, default_locale: impl Into<String>) -> Self {
        Self {
            sources,
            default_locale: default_locale.into(),
        }
    }

    pub fn origins(&self) -> Vec<ContentOrigin> {
        self.sources.iter().map(|source| source.origin()).collect()
    }

    #[instrument(skip(self))]
    pub async fn page(&self, slug: &str, locale: Option<&str>) -> Option<Resolved<Page>> {
        deps::record_all([CacheTag::pages(), CacheTag::page(slug)]);
        let locale = locale.unwrap_or(self.default_locale.as_str());
        self.first_some("page", slug, |source| source.page(slug, locale), Page::is_visible)
            .await
    }

    pub async fn pages(&self) -> Option<Resolved<Vec<PageSummary>>> {
        deps::record_all([CacheTag::pages(), CacheTag::navigation()]);
        self.first_non_empty(
            "pages",
            "*",
            |source| source.pages(),
            |page: &PageSummary| page.status == ContentStatus::Published,
        )
        .await
    }

    pub async fn navigation(&self) -> Option<Resolved<Vec<NavigationItem>>> {
        deps::record_all([CacheTag::pages(), CacheTag::navigation()]);
        self.first_non_empty("navigation", "*", |source| source.navigation(), |_| true)
            .await
    }

    #[instrument(skip(self))]
    pub async fn collection(&self, slug: &str) -> Option<Resolved<Collection>> {
        deps::record_all([CacheTag::collection(slug), CacheTag::collection_scope(slug)]);
        self.first_some("collection", slug, |source| source.collection(slug), |_| true)
            .await
    }

    #[instrument(skip(self))]
    pub async fn collection_items(
        &self,
        collection: &str,
    ) -> Option<Resolved<Vec<CollectionItemSummary>>> {
        deps::record_all([
            CacheTag::collection(collection),
            CacheTag::collection_scope(collection),
        ]);
        self.first_non_empty(
            "collection_items",
            collection,
            |source| source.collection_items(collection),
            |item: &CollectionItemSummary| item.status == ContentStatus::Published,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn collection_item(
        &self,
        collection: &str,
        item: &str,
    ) -> Option<Resolved<CollectionItem>> {
        deps::record_all([
            CacheTag::collection(collection),
            CacheTag::item(collection, item),
        ]);
        self.first_some(
            "collection_item",
            item,
            |source| source.collection_item(collection, item),
            CollectionItem::is_visible,
        )
        .await
    }

    async fn first_some<'a, T, F, P>(
        &'a self,
        kind: &'static str,
        key: &str,
        fetch: F,
        accept: P,
    ) -> Option<Resolved<T>>
    where
        F: Fn(&'a dyn ContentSource) -> BoxFuture<'a, Option<T>>,
        P: Fn(&T) -> bool,
    {
        for source in &self.sources {
            let origin = source.origin();
            match fetch(source.as_ref()).await {
                Some(value) if accept(&value) => return Some(resolved(kind, value, origin)),
                Some(_) => debug!(kind, key, %origin, "source returned unpublished content"),
                None => debug!(kind, key, %origin, "source had no result"),
            }
        }
        unresolved(kind, key);
        None
    }

    async fn first_non_empty<'a, T, F, P>(
        &'a self,
        kind: &'static str,
        key: &str,
        fetch: F,
        keep: P,
    ) -> Option<Resolved<Vec<T>>>
    where
        F: Fn(&'a dyn ContentSource) -> BoxFuture<'a, Vec<T>>,
        P: Fn(&T) -> bool,
    {
        for source in &self.sources {
            let origin = source.origin();
            let mut values = fetch(source.as_ref()).await;
            values.retain(|value| keep(value));
            if values.is_empty() {
                debug!(kind, key, %origin, "source had no entries");
                continue;
            }
            return Some(resolved(kind, values, origin));
        }
        unresolved(kind, key);
        None
    }
}

fn resolved<T>(kind: &'static str, value: T, origin: ContentOrigin) -> Resolved<T> {
    debug!(kind, %origin, "content resolved");
    counter!(
        "cmsfront_content_resolved_total",
        "kind" => kind,
        "origin" => origin.as_str()
    )
    .increment(1);
    Resolved { value, origin }
}

fn unresolved(kind: &'static str, key: &str) {
    debug!(kind, key, "no source could resolve content");
    counter!("cmsfront_content_unresolved_total", "kind" => kind).increment(1);
}
