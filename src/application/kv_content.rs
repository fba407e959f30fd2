//! Content snapshot reader over the KV store the CMS publishes into.
//!
//! Key schema:
//!
//! | key                          | value                                  |
//! |------------------------------|----------------------------------------|
//! | `page:{slug}`                | page JSON                              |
//! | `page:{locale}:{slug}`       | locale-specific page JSON              |
//! | `pages:list`                 | sorted set of page slugs               |
//! | `pages:navigation`           | set of slugs shown in navigation       |
//! | `collection:{slug}`          | collection metadata JSON               |
//! | `collection:{slug}:items`    | sorted set of item slugs               |
//! | `item:{collection}:{slug}`   | item JSON                              |
//! | `site:last-sync`             | timestamp of the last publish          |
//!
//! Reads never fail outward: a store error turns into `None` or an empty
//! list, and a single unreadable document is dropped from a fan-out.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use cmsfront_types::{
    Collection, CollectionItem, CollectionItemSummary, KvHealth, NavigationItem, Page,
    PageSummary,
};
use futures::future::join_all;
use metrics::counter;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::application::repos::{KvBackend, RepoError};
use crate::application::sources::{ContentOrigin, ContentSource};
use crate::domain::routes::{HOME_SLUG, page_path};

pub mod keys {
    pub const PAGES_LIST: &str = "pages:list";
    pub const PAGES_NAVIGATION: &str = "pages:navigation";
    pub const LAST_SYNC: &str = "site:last-sync";

    pub fn page(slug: &str) -> String {
        format!("page:{slug}")
    }

    pub fn localized_page(locale: &str, slug: &str) -> String {
        format!("page:{locale}:{slug}")
    }

    pub fn collection(slug: &str) -> String {
        format!("collection:{slug}")
    }

    pub fn collection_items(slug: &str) -> String {
        format!("collection:{slug}:items")
    }

    pub fn item(collection: &str, item: &str) -> String {
        format!("item:{collection}:{item}")
    }
}

#[derive(Clone)]
pub struct KvContentReader {
    backend: Arc<dyn KvBackend>,
}

impl KvContentReader {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Every page listed in `pages:list`, in set order.
    pub async fn pages(&self) -> Vec<Page> {
        let slugs = match self.backend.zrange(keys::PAGES_LIST, false).await {
            Ok(slugs) => slugs,
            Err(err) => return failed(keys::PAGES_LIST, &err),
        };
        self.documents(slugs.iter().map(|slug| keys::page(slug)).collect())
            .await
    }

    /// The locale-specific page when one exists, otherwise the default one.
    pub async fn page(&self, slug: &str, locale: &str) -> Option<Page> {
        let localized = keys::localized_page(locale, slug);
        match self.document::<Page>(&localized).await {
            Ok(Some(page)) => return Some(page),
            Ok(None) => {}
            Err(err) => return failed(&localized, &err),
        }

        let key = keys::page(slug);
        self.document(&key)
            .await
            .unwrap_or_else(|err| failed(&key, &err))
    }

    /// Pages flagged for navigation, home excluded, ordered by `sortIndex`.
    pub async fn navigation_pages(&self) -> Vec<Page> {
        let slugs = match self.backend.smembers(keys::PAGES_NAVIGATION).await {
            Ok(slugs) => slugs,
            Err(err) => return failed(keys::PAGES_NAVIGATION, &err),
        };

        let mut pages: Vec<Page> = self
            .documents(slugs.iter().map(|slug| keys::page(slug)).collect())
            .await;
        pages.retain(|page| page.slug != HOME_SLUG);
        pages.sort_by_key(|page| page.sort_index.unwrap_or(0));
        pages
    }

    pub async fn collection(&self, slug: &str) -> Option<Collection> {
        let key = keys::collection(slug);
        self.document(&key)
            .await
            .unwrap_or_else(|err| failed(&key, &err))
    }

    /// Items of a collection, most recent first.
    pub async fn collection_items(&self, collection: &str) -> Vec<CollectionItem> {
        let set = keys::collection_items(collection);
        let slugs = match self.backend.zrange(&set, true).await {
            Ok(slugs) => slugs,
            Err(err) => return failed(&set, &err),
        };
        self.documents(
            slugs
                .iter()
                .map(|slug| keys::item(collection, slug))
                .collect(),
        )
        .await
    }

    pub async fn collection_item(&self, collection: &str, item: &str) -> Option<CollectionItem> {
        let key = keys::item(collection, item);
        self.document(&key)
            .await
            .unwrap_or_else(|err| failed(&key, &err))
    }

    pub async fn last_sync(&self) -> Option<String> {
        self.backend
            .get(keys::LAST_SYNC)
            .await
            .unwrap_or_else(|err| failed(keys::LAST_SYNC, &err))
    }

    pub async fn health(&self) -> KvHealth {
        let start = Instant::now();
        match self.backend.ping().await {
            Ok(()) => KvHealth {
                healthy: true,
                latency_ms: Some(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)),
                error: None,
                last_sync: None,
            },
            Err(err) => KvHealth {
                healthy: false,
                latency_ms: None,
                error: Some(err.to_string()),
                last_sync: None,
            },
        }
    }

    async fn document<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepoError> {
        match self.backend.json_get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(RepoError::decode),
            None => Ok(None),
        }
    }

    async fn documents<T: DeserializeOwned>(&self, keys: Vec<String>) -> Vec<T> {
        let reads = keys.iter().map(|key| async move {
            match self.document::<T>(key).await {
                Ok(document) => document,
                Err(err) => failed(key, &err),
            }
        });
        join_all(reads).await.into_iter().flatten().collect()
    }
}

fn failed<T: Default>(key: &str, err: &RepoError) -> T {
    warn!(source = "kv", key, error = %err, "kv read failed");
    counter!("cmsfront_source_failure_total", "source" => "kv").increment(1);
    T::default()
}

#[async_trait]
impl ContentSource for KvContentReader {
    fn origin(&self) -> ContentOrigin {
        ContentOrigin::Kv
    }

    async fn page(&self, slug: &str, locale: &str) -> Option<Page> {
        KvContentReader::page(self, slug, locale).await
    }

    async fn pages(&self) -> Vec<PageSummary> {
        KvContentReader::pages(self)
            .await
            .into_iter()
            .map(PageSummary::from)
            .collect()
    }

    async fn navigation(&self) -> Vec<NavigationItem> {
        self.navigation_pages()
            .await
            .into_iter()
            .map(|page| NavigationItem {
                path: page.path.clone().unwrap_or_else(|| page_path(&page.slug)),
                id: page.id,
                slug: page.slug,
                title: page.title,
                depth: 0,
                children: Vec::new(),
            })
            .collect()
    }

    async fn collection(&self, slug: &str) -> Option<Collection> {
        KvContentReader::collection(self, slug).await
    }

    async fn collection_items(&self, collection: &str) -> Vec<CollectionItemSummary> {
        KvContentReader::collection_items(self, collection)
            .await
            .into_iter()
            .map(CollectionItemSummary::from)
            .collect()
    }

    async fn collection_item(&self, collection: &str, item: &str) -> Option<CollectionItem> {
        KvContentReader::collection_item(self, collection, item).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::{Value, json};

    use super::*;

    #[derive(Default)]
    struct MemoryKv {
        documents: HashMap<String, Value>,
        sorted: HashMap<String, Vec<String>>,
        sets: HashMap<String, Vec<String>>,
        strings: HashMap<String, String>,
        broken: Vec<String>,
        down: bool,
        reads: Mutex<Vec<String>>,
    }

    impl MemoryKv {
        fn check(&self, key: &str) -> Result<(), RepoError> {
            if let Ok(mut reads) = self.reads.lock() {
                reads.push(key.to_string());
            }
            if self.down || self.broken.iter().any(|broken| broken == key) {
                return Err(RepoError::Transport("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KvBackend for MemoryKv {
        async fn zrange(&self, key: &str, rev: bool) -> Result<Vec<String>, RepoError> {
            self.check(key)?;
            let mut members = self.sorted.get(key).cloned().unwrap_or_default();
            if rev {
                members.reverse();
            }
            Ok(members)
        }

        async fn smembers(&self, key: &str) -> Result<Vec<String>, RepoError> {
            self.check(key)?;
            Ok(self.sets.get(key).cloned().unwrap_or_default())
        }

        async fn json_get(&self, key: &str) -> Result<Option<Value>, RepoError> {
            self.check(key)?;
            Ok(self.documents.get(key).cloned())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, RepoError> {
            self.check(key)?;
            Ok(self.strings.get(key).cloned())
        }

        async fn ping(&self) -> Result<(), RepoError> {
            self.check("PING")
        }
    }

    fn page_json(slug: &str, sort_index: Option<i64>) -> Value {
        json!({
            "id": format!("id-{slug}"),
            "slug": slug,
            "title": slug.to_uppercase(),
            "status": "published",
            "sortIndex": sort_index,
            "publishedAt": "2024-01-15T00:00:00Z"
        })
    }

    fn reader(kv: MemoryKv) -> KvContentReader {
        KvContentReader::new(Arc::new(kv))
    }

    #[tokio::test]
    async fn localized_page_wins_over_default() {
        let mut kv = MemoryKv::default();
        kv.documents.insert(keys::page("about"), page_json("about", None));
        let mut german = page_json("about", None);
        german["title"] = json!("Über uns");
        kv.documents.insert(keys::localized_page("de", "about"), german);
        let reader = reader(kv);

        let page = reader.page("about", "de").await.expect("localized page");
        assert_eq!(page.title, "Über uns");

        let fallback = reader.page("about", "fr").await.expect("default page");
        assert_eq!(fallback.title, "ABOUT");
    }

    #[tokio::test]
    async fn navigation_excludes_home_and_sorts_by_index() {
        let mut kv = MemoryKv::default();
        kv.sets.insert(
            keys::PAGES_NAVIGATION.into(),
            vec!["pricing".into(), "home".into(), "about".into(), "docs".into()],
        );
        kv.documents.insert(keys::page("home"), page_json("home", Some(0)));
        kv.documents.insert(keys::page("pricing"), page_json("pricing", Some(2)));
        kv.documents.insert(keys::page("about"), page_json("about", Some(1)));
        kv.documents.insert(keys::page("docs"), page_json("docs", None));

        let slugs: Vec<String> = reader(kv)
            .navigation_pages()
            .await
            .into_iter()
            .map(|page| page.slug)
            .collect();
        assert_eq!(slugs, vec!["docs", "about", "pricing"]);
    }

    #[tokio::test]
    async fn fan_out_drops_unreadable_documents() {
        let mut kv = MemoryKv::default();
        kv.sorted.insert(
            keys::collection_items("news"),
            vec!["old".into(), "broken".into(), "new".into()],
        );
        for slug in ["old", "new"] {
            kv.documents.insert(
                keys::item("news", slug),
                json!({"id": slug, "slug": slug, "title": slug, "status": "published"}),
            );
        }
        kv.broken.push(keys::item("news", "broken"));

        let items = reader(kv).collection_items("news").await;
        let slugs: Vec<&str> = items.iter().map(|item| item.slug.as_str()).collect();
        assert_eq!(slugs, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn malformed_document_is_treated_as_absent() {
        let mut kv = MemoryKv::default();
        kv.documents
            .insert(keys::collection("news"), json!({"unexpected": true}));

        assert!(reader(kv).collection("news").await.is_none());
    }

    #[tokio::test]
    async fn store_outage_yields_empty_results() {
        let kv = MemoryKv {
            down: true,
            ..Default::default()
        };
        let reader = reader(kv);

        assert!(reader.pages().await.is_empty());
        assert!(reader.page("about", "en").await.is_none());
        assert!(reader.last_sync().await.is_none());
    }

    #[tokio::test]
    async fn localized_lookup_error_skips_default_key() {
        let mut kv = MemoryKv::default();
        kv.broken.push(keys::localized_page("en", "about"));
        kv.documents.insert(keys::page("about"), page_json("about", None));
        let kv = Arc::new(kv);
        let reader = KvContentReader::new(kv.clone());

        assert!(reader.page("about", "en").await.is_none());
        let reads = kv.reads.lock().expect("reads").clone();
        assert_eq!(reads, vec!["page:en:about".to_string()]);
    }

    #[tokio::test]
    async fn health_reports_latency_or_error() {
        let healthy = reader(MemoryKv::default()).health().await;
        assert!(healthy.healthy);
        assert!(healthy.latency_ms.is_some());

        let down = reader(MemoryKv {
            down: true,
            ..Default::default()
        })
        .health()
        .await;
        assert!(!down.healthy);
        assert!(down.error.is_some_and(|error| error.contains("connection refused")));
    }

    #[tokio::test]
    async fn last_sync_reads_plain_string() {
        let mut kv = MemoryKv::default();
        kv.strings
            .insert(keys::LAST_SYNC.into(), "2024-03-01T12:00:00Z".into());
        assert_eq!(
            reader(kv).last_sync().await.as_deref(),
            Some("2024-03-01T12:00:00Z")
        );
    }
}
