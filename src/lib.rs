//! Marketing site front-end backed by a headless CMS.
//!
//! Pages and collection items are resolved from a KV snapshot, the CMS
//! content API, or bundled static content, in that order, and rendered
//! through askama layouts. Rendered responses are cached in memory and
//! dropped by the CMS revalidation webhook.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
