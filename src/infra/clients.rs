//! Process-wide source clients, built on first use.

use std::sync::Arc;

use async_trait::async_trait;
use cmsfront_types::{
    Collection, CollectionItem, CollectionItemSummary, NavigationItem, Page, PageSummary,
};
use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::application::fallback::StaticSource;
use crate::application::kv_content::KvContentReader;
use crate::application::resolver::ContentResolver;
use crate::application::sources::{ContentOrigin, ContentSource};
use crate::config::{CmsSettings, KvSettings, Settings};
use crate::infra::cms::CmsClient;
use crate::infra::error::InfraError;
use crate::infra::kv::UpstashClient;

/// Holds the KV reader and CMS client. Each is created the first time it is
/// asked for; an unconfigured or unbuildable client stays `None` for the
/// life of the process.
pub struct SourceClients {
    kv_settings: KvSettings,
    cms_settings: CmsSettings,
    default_locale: String,
    kv: OnceCell<Option<Arc<KvContentReader>>>,
    cms: OnceCell<Option<Arc<CmsClient>>>,
}

impl SourceClients {
    pub fn new(settings: &Settings) -> Self {
        Self {
            kv_settings: settings.kv.clone(),
            cms_settings: settings.cms.clone(),
            default_locale: settings.site.default_locale.clone(),
            kv: OnceCell::new(),
            cms: OnceCell::new(),
        }
    }

    pub fn kv_configured(&self) -> bool {
        self.kv_settings.credentials().is_some()
    }

    pub fn cms_configured(&self) -> bool {
        self.cms_settings.credentials().is_some()
    }

    pub fn kv(&self) -> Option<Arc<KvContentReader>> {
        self.kv
            .get_or_init(|| {
                let (url, token) = self.kv_settings.credentials()?;
                built(
                    "kv",
                    UpstashClient::new(url, token, self.kv_settings.timeout)
                        .map(|client| KvContentReader::new(Arc::new(client))),
                )
            })
            .clone()
    }

    pub fn cms(&self) -> Option<Arc<CmsClient>> {
        self.cms
            .get_or_init(|| {
                let (url, api_key) = self.cms_settings.credentials()?;
                built(
                    "api",
                    CmsClient::new(
                        url,
                        api_key,
                        self.cms_settings.site_id.clone(),
                        self.default_locale.clone(),
                        self.cms_settings.timeout,
                    ),
                )
            })
            .clone()
    }
}

fn built<T>(source: &'static str, result: Result<T, InfraError>) -> Option<Arc<T>> {
    match result {
        Ok(client) => {
            info!(source, "content source client ready");
            Some(Arc::new(client))
        }
        Err(err) => {
            error!(source, error = %err, "content source client could not be built");
            None
        }
    }
}

/// The resolver chain for the configured sources, static content last.
pub fn build_resolver(
    clients: Arc<SourceClients>,
    fallback: StaticSource,
    default_locale: &str,
) -> ContentResolver {
    let mut sources: Vec<Arc<dyn ContentSource>> = Vec::with_capacity(3);
    if clients.kv_configured() {
        sources.push(Arc::new(LazySource {
            clients: clients.clone(),
            origin: ContentOrigin::Kv,
        }));
    }
    if clients.cms_configured() {
        sources.push(Arc::new(LazySource {
            clients,
            origin: ContentOrigin::Api,
        }));
    }
    sources.push(Arc::new(fallback));
    ContentResolver::new(sources, default_locale)
}

/// Chain link that resolves its client through [`SourceClients`] on first use.
struct LazySource {
    clients: Arc<SourceClients>,
    origin: ContentOrigin,
}

impl LazySource {
    fn source(&self) -> Option<Arc<dyn ContentSource>> {
        match self.origin {
            ContentOrigin::Kv => self
                .clients
                .kv()
                .map(|reader| reader as Arc<dyn ContentSource>),
            ContentOrigin::Api => self
                .clients
                .cms()
                .map(|client| client as Arc<dyn ContentSource>),
            ContentOrigin::Static => None,
        }
    }
}

#[async_trait]
impl ContentSource for LazySource {
    fn origin(&self) -> ContentOrigin {
        self.origin
    }

    async fn page(&self, slug: &str, locale: &str) -> Option<Page> {
        self.source()?.page(slug, locale).await
    }

    async fn pages(&self) -> Vec<PageSummary> {
        match self.source() {
            Some(source) => source.pages().await,
            None => Vec::new(),
        }
    }

    async fn navigation(&self) -> Vec<NavigationItem> {
        match self.source() {
            Some(source) => source.navigation().await,
            None => Vec::new(),
        }
    }

    async fn collection(&self, slug: &str) -> Option<Collection> {
        self.source()?.collection(slug).await
    }

    async fn collection_items(&self, collection: &str) -> Vec<CollectionItemSummary> {
        match self.source() {
            Some(source) => source.collection_items(collection).await,
            None => Vec::new(),
        }
    }

    async fn collection_item(&self, collection: &str, item: &str) -> Option<CollectionItem> {
        self.source()?.collection_item(collection, item).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{
        CacheSettings, CrmSettings, LogFormat, LoggingSettings, RevalidateSettings,
        ServerSettings, SiteEnvironment, SiteSettings,
    };

    fn settings(kv: Option<(&str, &str)>, cms: Option<(&str, &str)>) -> Settings {
        Settings {
            server: ServerSettings {
                addr: "127.0.0.1:0".parse().expect("addr"),
                graceful_shutdown: Duration::from_secs(1),
            },
            logging: LoggingSettings {
                level: tracing::level_filters::LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            site: SiteSettings {
                name: "Test".into(),
                tagline: None,
                environment: SiteEnvironment::Production,
                default_locale: "en".into(),
            },
            cms: CmsSettings {
                url: cms.map(|(url, _)| url.to_string()),
                api_key: cms.map(|(_, key)| key.to_string()),
                site_id: None,
                timeout: Duration::from_secs(1),
            },
            kv: KvSettings {
                url: kv.map(|(url, _)| url.to_string()),
                token: kv.map(|(_, token)| token.to_string()),
                timeout: Duration::from_secs(1),
            },
            revalidate: RevalidateSettings::default(),
            cache: CacheSettings {
                enabled: false,
                response_limit: 1,
                fallback_ttl: None,
            },
            crm: CrmSettings {
                api_key: None,
                api_url: "https://api.attio.com/v2".into(),
                list: "iv_cms_site".into(),
            },
        }
    }

    #[test]
    fn unconfigured_clients_are_absent() {
        let clients = SourceClients::new(&settings(None, None));
        assert!(clients.kv().is_none());
        assert!(clients.cms().is_none());
    }

    #[test]
    fn clients_are_created_once() {
        let clients = SourceClients::new(&settings(
            Some(("https://kv.example.com", "token")),
            Some(("https://cms.example.com", "key")),
        ));
        let first = clients.cms().expect("cms client");
        let second = clients.cms().expect("cms client");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(clients.kv().is_some());
    }

    #[test]
    fn chain_follows_configuration() {
        let fallback = || StaticSource::new("Test", "en");

        let clients = Arc::new(SourceClients::new(&settings(None, None)));
        let resolver = build_resolver(clients, fallback(), "en");
        assert_eq!(resolver.origins(), vec![ContentOrigin::Static]);

        let clients = Arc::new(SourceClients::new(&settings(
            Some(("https://kv.example.com", "token")),
            Some(("https://cms.example.com", "key")),
        )));
        let resolver = build_resolver(clients.clone(), fallback(), "en");
        assert_eq!(
            resolver.origins(),
            vec![ContentOrigin::Kv, ContentOrigin::Api, ContentOrigin::Static]
        );
        assert!(clients.cms.get().is_none(), "building the chain stays lazy");
    }
}
