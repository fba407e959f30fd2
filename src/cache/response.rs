//! Response cache facade shared by the middleware and the revalidation service.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::{CacheTag, Invalidation, ResponseKey};
use super::lock::Unpoison;
use super::registry::TagRegistry;
use super::store::{CachedResponse, Lookup, ResponseStore};

const SOURCE: &str = "cache::response";

#[derive(Clone)]
pub struct ResponseCache {
    config: CacheConfig,
    store: Arc<ResponseStore>,
    registry: Arc<TagRegistry>,
    /// Bumped by every `apply`. A render that started under an older
    /// generation may carry content the webhook just invalidated.
    generation: Arc<RwLock<u64>>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(ResponseStore::new(&config));
        Self {
            config,
            store,
            registry: Arc::new(TagRegistry::new()),
            generation: Arc::new(RwLock::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn lookup(&self, key: &ResponseKey) -> Option<CachedResponse> {
        match self.store.get(key) {
            Lookup::Fresh(cached) => {
                counter!("cmsfront_cache_response_hit_total").increment(1);
                Some(cached)
            }
            Lookup::Expired => {
                self.registry.unregister(key);
                counter!("cmsfront_cache_response_miss_total").increment(1);
                debug!(path = %key.path, "cached response outlived its ttl");
                None
            }
            Lookup::Absent => {
                counter!("cmsfront_cache_response_miss_total").increment(1);
                None
            }
        }
    }

    pub fn insert(&self, key: ResponseKey, response: CachedResponse, tags: HashSet<CacheTag>) {
        if let Some(evicted) = self.store.set(key.clone(), response) {
            self.registry.unregister(&evicted);
            counter!("cmsfront_cache_response_evict_total").increment(1);
        }
        self.registry.register(key, tags);
    }

    pub fn generation(&self) -> u64 {
        *self.generation.read().unpoison(SOURCE, "generation")
    }

    /// Store a response rendered while the cache was at generation `since`.
    /// Returns `false`, storing nothing, when an invalidation ran meanwhile.
    pub fn insert_if_unchanged(
        &self,
        key: ResponseKey,
        response: CachedResponse,
        tags: HashSet<CacheTag>,
        since: u64,
    ) -> bool {
        let generation = self.generation.read().unpoison(SOURCE, "insert_if_unchanged");
        if *generation != since {
            return false;
        }
        self.insert(key, response, tags);
        true
    }

    /// Apply invalidations in order, returning how many stored responses were
    /// dropped.
    pub fn apply(&self, invalidations: &[Invalidation]) -> usize {
        let mut generation = self.generation.write().unpoison(SOURCE, "apply");
        *generation += 1;
        invalidations
            .iter()
            .map(|invalidation| self.apply_one(invalidation))
            .sum()
    }

    fn apply_one(&self, invalidation: &Invalidation) -> usize {
        let dropped = match invalidation {
            Invalidation::Path(path) => self.drop_keys(self.store.keys_for_path(path)),
            Invalidation::Tag(tag) => self
                .registry
                .take_tag(tag)
                .iter()
                .filter(|key| self.store.remove(key))
                .count(),
            Invalidation::Layout(prefix) if prefix == "/" => {
                self.registry.clear();
                self.store.clear()
            }
            Invalidation::Layout(prefix) => self.drop_keys(self.store.keys_under(prefix)),
        };
        debug!(%invalidation, dropped, "applied cache invalidation");
        dropped
    }

    fn drop_keys(&self, keys: Vec<ResponseKey>) -> usize {
        keys.into_iter()
            .filter(|key| {
                self.registry.unregister(key);
                self.store.remove(key)
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, key: &ResponseKey) -> bool {
        self.store.contains(key)
    }
}
