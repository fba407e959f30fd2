//! Content tag collector for response cache invalidation.
//!
//! The middleware opens a collector around each request. Anything that reads
//! content records the tags it depends on; once the handler finishes, the
//! collected set is registered against the stored response.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use super::keys::CacheTag;
use super::lock::Unpoison;

const SOURCE: &str = "cache::deps";

type Collector = Arc<Mutex<HashSet<CacheTag>>>;

tokio::task_local! {
    static TAGS: Collector;
}

/// Record a content dependency. Without an active collector this is a no-op.
pub fn record(tag: CacheTag) {
    let _ = TAGS.try_with(|tags| {
        tags.lock().unpoison(SOURCE, "record").insert(tag);
    });
}

pub fn record_all(tags: impl IntoIterator<Item = CacheTag>) {
    let _ = TAGS.try_with(|collector| {
        collector.lock().unpoison(SOURCE, "record_all").extend(tags);
    });
}

/// Run `f` with a fresh collector and return its output with the tags it
/// recorded.
///
/// The collector is shared with the scope, so the tags are read after the
/// scope has ended rather than through the task local.
pub async fn with_collector<F>(f: F) -> (F::Output, HashSet<CacheTag>)
where
    F: Future,
{
    let collector: Collector = Arc::new(Mutex::new(HashSet::new()));
    let output = TAGS.scope(Arc::clone(&collector), f).await;
    let tags = std::mem::take(&mut *collector.lock().unpoison(SOURCE, "with_collector"));
    (output, tags)
}
