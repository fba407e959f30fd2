//! Rendered response storage.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::CacheConfig;
use super::keys::ResponseKey;
use super::lock::Unpoison;

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: Instant,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            stored_at: Instant::now(),
        }
    }
}

/// Outcome of a store lookup.
#[derive(Debug)]
pub enum Lookup {
    Fresh(CachedResponse),
    /// The entry outlived the fallback TTL and has been dropped.
    Expired,
    Absent,
}

/// LRU of rendered responses with an optional age limit.
pub struct ResponseStore {
    responses: RwLock<LruCache<ResponseKey, CachedResponse>>,
    ttl: Option<Duration>,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.response_limit_non_zero())),
            ttl: config.fallback_ttl(),
        }
    }

    pub fn get(&self, key: &ResponseKey) -> Lookup {
        let mut responses = self.responses.write().unpoison(SOURCE, "get");
        let expired = match responses.get(key) {
            None => return Lookup::Absent,
            Some(entry) => self
                .ttl
                .is_some_and(|ttl| entry.stored_at.elapsed() >= ttl),
        };
        if expired {
            responses.pop(key);
            return Lookup::Expired;
        }
        responses
            .get(key)
            .cloned()
            .map_or(Lookup::Absent, Lookup::Fresh)
    }

    /// Store a response, returning the key pushed out by the LRU if any.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) -> Option<ResponseKey> {
        self.responses
            .write()
            .unpoison(SOURCE, "set")
            .push(key.clone(), response)
            .map(|(evicted, _)| evicted)
            .filter(|evicted| *evicted != key)
    }

    pub fn remove(&self, key: &ResponseKey) -> bool {
        self.responses.write().unpoison(SOURCE, "remove").pop(key).is_some()
    }

    pub fn contains(&self, key: &ResponseKey) -> bool {
        self.responses.read().unpoison(SOURCE, "contains").contains(key)
    }

    /// Every stored variant of `path`.
    pub fn keys_for_path(&self, path: &str) -> Vec<ResponseKey> {
        self.responses
            .read()
            .unpoison(SOURCE, "keys_for_path")
            .iter()
            .filter(|(key, _)| key.path == path)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Every stored key at or below `prefix`.
    pub fn keys_under(&self, prefix: &str) -> Vec<ResponseKey> {
        self.responses
            .read()
            .unpoison(SOURCE, "keys_under")
            .iter()
            .filter(|(key, _)| key.is_under(prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Drop everything, returning how many entries were held.
    pub fn clear(&self) -> usize {
        let mut responses = self.responses.write().unpoison(SOURCE, "clear");
        let count = responses.len();
        responses.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.responses.read().unpoison(SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn html(body: &'static str) -> CachedResponse {
        CachedResponse::new(
            200,
            vec![("content-type".to_string(), "text/html".to_string())],
            Bytes::from(body),
        )
    }

    #[test]
    fn response_roundtrip() {
        let store = ResponseStore::new(&CacheConfig::default());
        let key = ResponseKey::new("/about", "");

        assert!(matches!(store.get(&key), Lookup::Absent));
        assert!(store.set(key.clone(), html("About")).is_none());

        match store.get(&key) {
            Lookup::Fresh(cached) => assert_eq!(cached.body, Bytes::from("About")),
            other => panic!("expected fresh entry, got {other:?}"),
        }

        assert!(store.remove(&key));
        assert!(matches!(store.get(&key), Lookup::Absent));
    }

    #[test]
    fn lru_eviction_reports_evicted_key() {
        let store = ResponseStore::new(&CacheConfig {
            response_limit: 2,
            ..Default::default()
        });
        let first = ResponseKey::new("/a", "");
        store.set(first.clone(), html("a"));
        store.set(ResponseKey::new("/b", ""), html("b"));

        let evicted = store.set(ResponseKey::new("/c", ""), html("c"));
        assert_eq!(evicted, Some(first));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn replacing_an_entry_is_not_an_eviction() {
        let store = ResponseStore::new(&CacheConfig::default());
        let key = ResponseKey::new("/a", "");
        store.set(key.clone(), html("one"));
        assert!(store.set(key, html("two")).is_none());
    }

    #[test]
    fn stale_entries_expire() {
        let store = ResponseStore::new(&CacheConfig::default());
        let key = ResponseKey::new("/a", "");
        let mut stale = html("old");
        stale.stored_at = Instant::now()
            .checked_sub(Duration::from_secs(120))
            .expect("clock has run for two minutes");
        store.set(key.clone(), stale);

        assert!(matches!(store.get(&key), Lookup::Expired));
        assert!(store.is_empty());
    }

    #[test]
    fn path_lookup_covers_query_variants() {
        let store = ResponseStore::new(&CacheConfig::default());
        store.set(ResponseKey::new("/solutions", ""), html("a"));
        store.set(ResponseKey::new("/solutions", "ref=nav"), html("b"));
        store.set(ResponseKey::new("/about", ""), html("c"));

        assert_eq!(store.keys_for_path("/solutions").len(), 2);
        assert_eq!(store.keys_under("/").len(), 3);
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = ResponseStore::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .responses
                .write()
                .expect("responses lock should be acquired");
            panic!("poison responses lock");
        }));

        store.set(ResponseKey::new("/a", ""), html("a"));
        assert_eq!(store.len(), 1);
    }
}
