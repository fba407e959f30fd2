//! Webhook-driven cache invalidation.

use cmsfront_types::{RevalidateResponse, WebhookPayload, WebhookSubject};
use metrics::counter;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::cache::{CacheTag, Invalidation, ResponseCache};
use crate::domain::routes::{
    HOME_SLUG, PERSPECTIVES, SOLUTIONS, collection_path, item_path, page_path,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevalidateRejection {
    #[error("no revalidation secret is configured")]
    NotConfigured,
    #[error("revalidation secret did not match")]
    InvalidSecret,
}

/// Map a change notification to the cache actions it requires.
///
/// - page: its own path (home is `/`), then `/` because navigation may have
///   changed; `/` is listed once.
/// - item in `perspectives`: the listing and, with a slug, the article.
/// - item in `solutions`: the listing.
/// - item in any other collection, or a collection change: the collection tag.
/// - settings: the root layout, i.e. every rendered page.
///
/// Items and collections that do not name their collection produce nothing.
pub fn plan(payload: &WebhookPayload) -> Vec<Invalidation> {
    let data = &payload.data;
    let slug = non_empty(data.slug.as_deref());
    let collection = non_empty(data.collection_slug.as_deref());

    let mut plan = Vec::new();
    match data.subject {
        WebhookSubject::Page => {
            if let Some(slug) = slug {
                plan.push(Invalidation::Path(page_path(slug)));
            }
            let home = Invalidation::Path(page_path(HOME_SLUG));
            if !plan.contains(&home) {
                plan.push(home);
            }
        }
        WebhookSubject::Item => match collection {
            Some(PERSPECTIVES) => {
                plan.push(Invalidation::Path(collection_path(PERSPECTIVES)));
                if let Some(slug) = slug {
                    plan.push(Invalidation::Path(item_path(PERSPECTIVES, slug)));
                }
            }
            Some(SOLUTIONS) => plan.push(Invalidation::Path(collection_path(SOLUTIONS))),
            Some(other) => plan.push(Invalidation::Tag(CacheTag::collection(other))),
            None => {}
        },
        WebhookSubject::Collection => {
            if let Some(collection) = collection {
                plan.push(Invalidation::Tag(CacheTag::collection(collection)));
            }
        }
        WebhookSubject::Settings => plan.push(Invalidation::Layout("/".to_string())),
    }
    plan
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

pub struct RevalidationService {
    secret: Option<String>,
    cache: Option<ResponseCache>,
}

impl RevalidationService {
    pub fn new(secret: Option<String>, cache: Option<ResponseCache>) -> Self {
        Self {
            secret: secret.filter(|secret| !secret.is_empty()),
            cache,
        }
    }

    /// Fails closed: without a configured secret every caller is rejected.
    pub fn authorize(&self, provided: Option<&str>) -> Result<(), RevalidateRejection> {
        let Some(expected) = self.secret.as_deref() else {
            error!("revalidation secret is not configured; rejecting webhook");
            counter!("cmsfront_revalidate_total", "outcome" => "not_configured").increment(1);
            return Err(RevalidateRejection::NotConfigured);
        };

        let matches = provided
            .is_some_and(|provided| bool::from(provided.as_bytes().ct_eq(expected.as_bytes())));
        if !matches {
            counter!("cmsfront_revalidate_total", "outcome" => "unauthorized").increment(1);
            return Err(RevalidateRejection::InvalidSecret);
        }
        Ok(())
    }

    pub fn revalidate(&self, payload: &WebhookPayload) -> RevalidateResponse {
        let invalidations = plan(payload);
        let dropped = self
            .cache
            .as_ref()
            .map_or(0, |cache| cache.apply(&invalidations));
        let paths: Vec<String> = invalidations.iter().map(ToString::to_string).collect();

        info!(
            event = payload.event.as_str(),
            site_id = %payload.site_id,
            revalidated = %paths.join(", "),
            dropped,
            "processed revalidation webhook"
        );
        counter!("cmsfront_revalidate_total", "outcome" => "revalidated").increment(1);

        RevalidateResponse {
            revalidated: true,
            paths,
            timestamp: epoch_millis(),
        }
    }
}

fn epoch_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
