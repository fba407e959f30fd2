//! Typed client for the CMS content API (`/api/v1/content`).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use cmsfront_types::{
    Collection, CollectionItem, CollectionItemSummary, CollectionSummary, ContentStatus,
    ListResult, NavigationItem, Page, PageSummary,
};
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode, Url, header::AUTHORIZATION};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::sources::{ContentOrigin, ContentSource};
use crate::infra::error::InfraError;

const CONTENT_PREFIX: &str = "api/v1/content";

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("invalid CMS url: {0}")]
    Url(#[from] url::ParseError),
    #[error("CMS request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("CMS request timed out")]
    Timeout,
    #[error("CMS responded {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },
    #[error("failed to decode CMS response: {0}")]
    Decode(String),
}

impl CmsError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<String>,
    code: Option<String>,
}

/// Paging and status filter for list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub status: Option<ContentStatus>,
}

impl ListQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs
    }
}

#[derive(Clone, Debug)]
pub struct CmsClient {
    client: Client,
    base: Url,
    api_key: String,
    site_id: Option<String>,
    default_locale: String,
    draft: bool,
}

impl CmsClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        site_id: Option<String>,
        default_locale: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let trimmed = base_url.trim_end_matches('/');
        let base = Url::parse(&format!("{trimmed}/")).map_err(|err| {
            InfraError::configuration("cms url", format!("`{base_url}`: {err}"))
        })?;
        let client = Client::builder()
            .user_agent(concat!("cmsfront/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client("cms", err))?;

        Ok(Self {
            client,
            base,
            api_key: api_key.into(),
            site_id: site_id.filter(|id| !id.is_empty()),
            default_locale: default_locale.into(),
            draft: false,
        })
    }

    /// A client sharing this one's connection pool but defaulting to `locale`.
    pub fn with_locale(&self, locale: impl Into<String>) -> Self {
        Self {
            default_locale: locale.into(),
            ..self.clone()
        }
    }

    /// A client that asks the CMS for draft content.
    pub fn with_drafts(&self) -> Self {
        Self {
            draft: true,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub async fn list_pages(&self, query: &ListQuery) -> Result<ListResult<PageSummary>, CmsError> {
        self.get(&["pages"], &query.pairs()).await
    }

    pub async fn get_page(&self, slug: &str) -> Result<Page, CmsError> {
        self.get(&["pages", slug], &[]).await
    }

    pub async fn get_page_by_path(&self, path: &str) -> Result<Page, CmsError> {
        self.get(&["pages", "by-path"], &[("path", path.to_string())])
            .await
    }

    pub async fn list_collections(
        &self,
        query: &ListQuery,
    ) -> Result<ListResult<CollectionSummary>, CmsError> {
        let pairs: Vec<_> = query
            .pairs()
            .into_iter()
            .filter(|(key, _)| *key != "status")
            .collect();
        self.get(&["collections"], &pairs).await
    }

    pub async fn get_collection(&self, slug: &str) -> Result<Collection, CmsError> {
        self.get(&["collections", slug], &[]).await
    }

    pub async fn list_collection_items(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<ListResult<CollectionItemSummary>, CmsError> {
        self.get(&["collections", collection, "items"], &query.pairs())
            .await
    }

    pub async fn get_collection_item(
        &self,
        collection: &str,
        item: &str,
    ) -> Result<CollectionItem, CmsError> {
        self.get(&["collections", collection, "items", item], &[])
            .await
    }

    pub async fn get_navigation(
        &self,
        max_depth: Option<u32>,
    ) -> Result<Vec<NavigationItem>, CmsError> {
        let pairs: Vec<_> = max_depth
            .map(|depth| ("maxDepth", depth.to_string()))
            .into_iter()
            .collect();
        self.get(&["navigation"], &pairs).await
    }

    fn url(&self, segments: &[&str], query: &[(&'static str, String)]) -> Result<Url, CmsError> {
        let mut url = self.base.join(CONTENT_PREFIX)?;
        url.path_segments_mut()
            .map_err(|()| CmsError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .extend(segments);

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("locale", &self.default_locale);
            if self.draft {
                pairs.append_pair("draft", "true");
            }
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<T, CmsError> {
        let url = self.url(segments, query)?;
        debug!(url = %url, "cms request");

        let mut request = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key));
        if let Some(site_id) = &self.site_id {
            request = request.header("x-site-id", site_id);
        }

        let started = Instant::now();
        let outcome = request.send().await;
        histogram!("cmsfront_cms_request_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        let response = outcome.map_err(CmsError::from_reqwest)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(CmsError::from_reqwest)?;

        if !status.is_success() {
            let payload = serde_json::from_slice::<ErrorPayload>(&bytes).ok();
            let (message, code) = match payload {
                Some(ErrorPayload { error, code }) => (error, code),
                None => (None, None),
            };
            return Err(CmsError::Status {
                status,
                message: message
                    .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
                code,
            });
        }

        serde_json::from_slice(&bytes).map_err(|err| CmsError::Decode(err.to_string()))
    }
}

fn absorb<T: Default>(what: &str, key: &str, err: &CmsError) -> T {
    if err.status() == Some(StatusCode::NOT_FOUND) {
        debug!(source = "api", what, key, "not found in cms");
    } else {
        warn!(source = "api", what, key, error = %err, "cms read failed");
        counter!("cmsfront_source_failure_total", "source" => "api").increment(1);
    }
    T::default()
}

#[async_trait]
impl ContentSource for CmsClient {
    fn origin(&self) -> ContentOrigin {
        ContentOrigin::Api
    }

    async fn page(&self, slug: &str, locale: &str) -> Option<Page> {
        let client = if locale == self.default_locale {
            self.clone()
        } else {
            self.with_locale(locale)
        };
        client
            .get_page(slug)
            .await
            .map(Some)
            .unwrap_or_else(|err| absorb("page", slug, &err))
    }

    async fn pages(&self) -> Vec<PageSummary> {
        self.list_pages(&ListQuery::default())
            .await
            .map(|list| list.items)
            .unwrap_or_else(|err| absorb("pages", "pages", &err))
    }

    async fn navigation(&self) -> Vec<NavigationItem> {
        self.get_navigation(None)
            .await
            .unwrap_or_else(|err| absorb("navigation", "navigation", &err))
    }

    async fn collection(&self, slug: &str) -> Option<Collection> {
        self.get_collection(slug)
            .await
            .map(Some)
            .unwrap_or_else(|err| absorb("collection", slug, &err))
    }

    async fn collection_items(&self, collection: &str) -> Vec<CollectionItemSummary> {
        self.list_collection_items(collection, &ListQuery::default())
            .await
            .map(|list| list.items)
            .unwrap_or_else(|err| absorb("collection_items", collection, &err))
    }

    async fn collection_item(&self, collection: &str, item: &str) -> Option<CollectionItem> {
        self.get_collection_item(collection, item)
            .await
            .map(Some)
            .unwrap_or_else(|err| absorb("collection_item", item, &err))
    }
}
