//! Shared wire types for the headless CMS consumed by `cmsfront`.
//!
//! The content types mirror the JSON documents served by the CMS content API
//! (`/api/v1/content/...`) and the snapshots its publish pipeline pushes into
//! the KV store. The webhook types describe change notifications posted to the
//! site's revalidation endpoint.

pub mod content;
pub mod responses;
pub mod webhook;

pub use content::{
    Block, Collection, CollectionItem, CollectionItemSummary, CollectionSummary, ContentStatus,
    FieldDefinition, ItemSchema, ListResult, NavigationItem, Page, PageSummary, Seo,
};
pub use responses::{
    ContactRequest, ContactResponse, ErrorBody, FieldIssue, KvHealth, RevalidateHealth,
    RevalidateResponse,
};
pub use webhook::{WebhookData, WebhookEvent, WebhookPayload, WebhookSubject};
