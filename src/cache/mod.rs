//! Rendered-response cache.
//!
//! Content routes are served from an in-memory LRU of rendered responses.
//! Every stored response remembers the content tags its handler touched
//! (recorded through [`deps`]) so that revalidation webhooks can drop exactly
//! the affected pages:
//!
//! - a path invalidation drops every stored variant of that path,
//! - a tag invalidation drops every response registered under the tag,
//! - a layout invalidation drops everything below a path prefix.
//!
//! Entries older than the configured fallback TTL are treated as misses, which
//! keeps pages fresh even when no webhook arrives.
//!
//! ```toml
//! [cache]
//! enabled = true
//! response_limit = 200
//! fallback_ttl_seconds = 60
//! ```

mod config;
pub mod deps;
mod keys;
mod lock;
mod middleware;
mod registry;
mod response;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheTag, Invalidation, ResponseKey, hash_query, hash_value};
pub use middleware::response_cache_layer;
pub use registry::TagRegistry;
pub use response::ResponseCache;
pub use store::{CachedResponse, Lookup, ResponseStore};
