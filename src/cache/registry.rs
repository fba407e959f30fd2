//! Bidirectional tag registry.
//!
//! Tracks which stored responses depend on which content tags so a tag
//! invalidation can find its responses, and an evicted response can release
//! its tags.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheTag, ResponseKey};
use super::lock::Unpoison;

const SOURCE: &str = "cache::registry";

pub struct TagRegistry {
    tag_to_keys: RwLock<HashMap<CacheTag, HashSet<ResponseKey>>>,
    key_to_tags: RwLock<HashMap<ResponseKey, HashSet<CacheTag>>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Register a stored response with the tags it was rendered from.
    ///
    /// Re-registering a key replaces its previous tag set.
    pub fn register(&self, key: ResponseKey, tags: HashSet<CacheTag>) {
        let mut t2k = self.tag_to_keys.write().unpoison(SOURCE, "register.tag_to_keys");
        let mut k2t = self.key_to_tags.write().unpoison(SOURCE, "register.key_to_tags");

        if let Some(previous) = k2t.remove(&key) {
            detach(&mut t2k, &key, previous);
        }
        for tag in &tags {
            t2k.entry(tag.clone()).or_default().insert(key.clone());
        }
        k2t.insert(key, tags);
    }

    pub fn keys_for_tag(&self, tag: &CacheTag) -> HashSet<ResponseKey> {
        self.tag_to_keys
            .read()
            .unpoison(SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tags_for_key(&self, key: &ResponseKey) -> HashSet<CacheTag> {
        self.key_to_tags
            .read()
            .unpoison(SOURCE, "tags_for_key")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a response key, e.g. after eviction or invalidation.
    pub fn unregister(&self, key: &ResponseKey) {
        let mut t2k = self.tag_to_keys.write().unpoison(SOURCE, "unregister.tag_to_keys");
        let mut k2t = self.key_to_tags.write().unpoison(SOURCE, "unregister.key_to_tags");

        if let Some(tags) = k2t.remove(key) {
            detach(&mut t2k, key, tags);
        }
    }

    /// Remove a tag along with every response registered under it.
    ///
    /// Returns the removed response keys; their other tag mappings are
    /// released as well since the responses themselves are going away.
    pub fn take_tag(&self, tag: &CacheTag) -> HashSet<ResponseKey> {
        let mut t2k = self.tag_to_keys.write().unpoison(SOURCE, "take_tag.tag_to_keys");
        let mut k2t = self.key_to_tags.write().unpoison(SOURCE, "take_tag.key_to_tags");

        let affected = t2k.remove(tag).unwrap_or_default();
        for key in &affected {
            if let Some(tags) = k2t.remove(key) {
                detach(&mut t2k, key, tags);
            }
        }
        affected
    }

    pub fn clear(&self) {
        self.tag_to_keys.write().unpoison(SOURCE, "clear.tag_to_keys").clear();
        self.key_to_tags.write().unpoison(SOURCE, "clear.key_to_tags").clear();
    }

    pub fn tag_count(&self) -> usize {
        self.tag_to_keys.read().unpoison(SOURCE, "tag_count").len()
    }

    pub fn key_count(&self) -> usize {
        self.key_to_tags.read().unpoison(SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn detach(
    t2k: &mut HashMap<CacheTag, HashSet<ResponseKey>>,
    key: &ResponseKey,
    tags: HashSet<CacheTag>,
) {
    for tag in tags {
        if let Some(keys) = t2k.get_mut(&tag) {
            keys.remove(key);
            if keys.is_empty() {
                t2k.remove(&tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> HashSet<CacheTag> {
        names.iter().map(|name| CacheTag::new(*name)).collect()
    }

    #[test]
    fn register_and_lookup() {
        let registry = TagRegistry::new();
        let key = ResponseKey::new("/about", "");

        registry.register(key.clone(), tags(&["pages", "page:about"]));

        assert!(registry.keys_for_tag(&CacheTag::page("about")).contains(&key));
        assert_eq!(registry.tags_for_key(&key).len(), 2);
    }

    #[test]
    fn unregister_cleans_up_mappings() {
        let registry = TagRegistry::new();
        let key = ResponseKey::new("/about", "");
        registry.register(key.clone(), tags(&["pages"]));

        registry.unregister(&key);
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }

    #[test]
    fn reregistering_replaces_previous_tags() {
        let registry = TagRegistry::new();
        let key = ResponseKey::new("/", "");
        registry.register(key.clone(), tags(&["page:home"]));
        registry.register(key.clone(), tags(&["pages"]));

        assert!(registry.keys_for_tag(&CacheTag::page("home")).is_empty());
        assert!(registry.keys_for_tag(&CacheTag::pages()).contains(&key));
    }

    #[test]
    fn take_tag_returns_affected_keys_and_releases_them() {
        let registry = TagRegistry::new();
        let listing = ResponseKey::new("/perspectives", "");
        let article = ResponseKey::new("/perspectives/article-1", "");
        registry.register(listing.clone(), tags(&["perspectives", "navigation"]));
        registry.register(article.clone(), tags(&["perspectives"]));
        registry.register(ResponseKey::new("/about", ""), tags(&["navigation"]));

        let affected = registry.take_tag(&CacheTag::collection("perspectives"));
        assert_eq!(affected.len(), 2);
        assert!(affected.contains(&listing));
        assert!(affected.contains(&article));
        assert_eq!(registry.keys_for_tag(&CacheTag::navigation()).len(), 1);
        assert_eq!(registry.key_count(), 1);
    }

    #[test]
    fn clear_removes_all_mappings() {
        let registry = TagRegistry::new();
        registry.register(ResponseKey::new("/", ""), tags(&["pages"]));

        registry.clear();
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }
}
