//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "cmsfront";
const ENV_PREFIX: &str = "CMSFRONT";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_SITE_NAME: &str = "IV-CMS";
const DEFAULT_LOCALE: &str = "en";
const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CACHE_RESPONSE_LIMIT: usize = 200;
const DEFAULT_CACHE_FALLBACK_TTL_SECS: u64 = 60;
const DEFAULT_CRM_API_URL: &str = "https://api.attio.com/v2";
const DEFAULT_CRM_LIST: &str = "iv_cms_site";

/// Command-line arguments for the cmsfront binary.
#[derive(Debug, Parser)]
#[command(
    name = "cmsfront",
    version,
    about = "Marketing site backed by a headless CMS"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CMSFRONT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the site environment (production|development).
    #[arg(long = "site-environment", value_name = "ENV")]
    pub site_environment: Option<String>,

    /// Override the CMS base URL.
    #[arg(long = "cms-url", value_name = "URL")]
    pub cms_url: Option<String>,

    /// Override the KV REST URL.
    #[arg(long = "kv-url", value_name = "URL")]
    pub kv_url: Option<String>,

    /// Toggle the response cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the number of rendered responses kept in memory.
    #[arg(long = "cache-response-limit", value_name = "COUNT")]
    pub cache_response_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub site: SiteSettings,
    pub cms: CmsSettings,
    pub kv: KvSettings,
    pub revalidate: RevalidateSettings,
    pub cache: CacheSettings,
    pub crm: CrmSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteEnvironment {
    #[default]
    Production,
    Development,
}

impl SiteEnvironment {
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for SiteEnvironment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!(
                "unknown environment `{other}` (expected production or development)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub name: String,
    pub tagline: Option<String>,
    pub environment: SiteEnvironment,
    pub default_locale: String,
}

#[derive(Debug, Clone)]
pub struct CmsSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub site_id: Option<String>,
    pub timeout: Duration,
}

impl CmsSettings {
    /// Base URL and API key, present only when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.url.as_deref()?, self.api_key.as_deref()?))
    }
}

#[derive(Debug, Clone)]
pub struct KvSettings {
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl KvSettings {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.url.as_deref()?, self.token.as_deref()?))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RevalidateSettings {
    pub secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub response_limit: usize,
    /// `None` keeps stored responses until a webhook or eviction removes them.
    pub fallback_ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct CrmSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub list: String,
}

/// Which content sources the configuration enables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    KvAndApi,
    KvOnly,
    ApiOnly,
    StaticOnly,
}

impl ContentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentMode::KvAndApi => "kv+api",
            ContentMode::KvOnly => "kv",
            ContentMode::ApiOnly => "api",
            ContentMode::StaticOnly => "static",
        }
    }
}

impl Settings {
    pub fn content_mode(&self) -> ContentMode {
        match (self.kv.credentials().is_some(), self.cms.credentials().is_some()) {
            (true, true) => ContentMode::KvAndApi,
            (true, false) => ContentMode::KvOnly,
            (false, true) => ContentMode::ApiOnly,
            (false, false) => ContentMode::StaticOnly,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    site: RawSiteSettings,
    cms: RawCmsSettings,
    kv: RawKvSettings,
    revalidate: RawRevalidateSettings,
    cache: RawCacheSettings,
    crm: RawCrmSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(environment) = overrides.site_environment.as_ref() {
            self.site.environment = Some(environment.clone());
        }
        if let Some(url) = overrides.cms_url.as_ref() {
            self.cms.url = Some(url.clone());
        }
        if let Some(url) = overrides.kv_url.as_ref() {
            self.kv.url = Some(url.clone());
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(limit) = overrides.cache_response_limit {
            self.cache.response_limit = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            site,
            cms,
            kv,
            revalidate,
            cache,
            crm,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            site: build_site_settings(site)?,
            cms: build_cms_settings(cms)?,
            kv: build_kv_settings(kv)?,
            revalidate: RevalidateSettings {
                secret: non_empty(revalidate.secret),
            },
            cache: build_cache_settings(cache),
            crm: build_crm_settings(crm)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.as_deref().unwrap_or(DEFAULT_HOST);
    let ip = host.parse::<IpAddr>().map_err(|err| {
        LoadError::invalid("server.host", format!("`{host}` is not an IP address: {err}"))
    })?;
    let port = match server.port.unwrap_or(DEFAULT_PORT) {
        0 => return Err(LoadError::invalid("server.port", "must be greater than zero")),
        port => port,
    };
    let graceful_shutdown = positive_seconds(
        "server.graceful_shutdown_seconds",
        server.graceful_shutdown_seconds,
        DEFAULT_GRACEFUL_SHUTDOWN_SECS,
    )?;

    Ok(ServerSettings {
        addr: SocketAddr::new(ip, port),
        graceful_shutdown,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = logging
        .level
        .as_deref()
        .map(LevelFilter::from_str)
        .transpose()
        .map_err(|err| LoadError::invalid("logging.level", err.to_string()))?
        .unwrap_or(LevelFilter::INFO);
    let format = match logging.json {
        Some(true) => LogFormat::Json,
        _ => LogFormat::Compact,
    };
    Ok(LoggingSettings { level, format })
}

fn positive_seconds(
    key: &'static str,
    value: Option<u64>,
    default: u64,
) -> Result<Duration, LoadError> {
    match value.unwrap_or(default) {
        0 => Err(LoadError::invalid(key, "must be greater than zero")),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let environment = match site.environment {
        Some(value) => SiteEnvironment::from_str(&value)
            .map_err(|reason| LoadError::invalid("site.environment", reason))?,
        None => SiteEnvironment::default(),
    };

    let default_locale =
        non_empty(site.default_locale).unwrap_or_else(|| DEFAULT_LOCALE.to_string());
    if !default_locale
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(LoadError::invalid(
            "site.default_locale",
            format!("`{default_locale}` is not a locale tag"),
        ));
    }

    Ok(SiteSettings {
        name: non_empty(site.name).unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        tagline: non_empty(site.tagline),
        environment,
        default_locale,
    })
}

fn build_cms_settings(cms: RawCmsSettings) -> Result<CmsSettings, LoadError> {
    Ok(CmsSettings {
        url: validated_url(cms.url, "cms.url")?,
        api_key: non_empty(cms.api_key),
        site_id: non_empty(cms.site_id),
        timeout: timeout(cms.timeout_ms, "cms.timeout_ms")?,
    })
}

fn build_kv_settings(kv: RawKvSettings) -> Result<KvSettings, LoadError> {
    Ok(KvSettings {
        url: validated_url(kv.url, "kv.url")?,
        token: non_empty(kv.token),
        timeout: timeout(kv.timeout_ms, "kv.timeout_ms")?,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    let ttl_secs = cache
        .fallback_ttl_seconds
        .unwrap_or(DEFAULT_CACHE_FALLBACK_TTL_SECS);

    CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        response_limit: cache
            .response_limit
            .unwrap_or(DEFAULT_CACHE_RESPONSE_LIMIT)
            .max(1),
        fallback_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
    }
}

fn build_crm_settings(crm: RawCrmSettings) -> Result<CrmSettings, LoadError> {
    let api_url = validated_url(crm.api_url, "crm.api_url")?
        .unwrap_or_else(|| DEFAULT_CRM_API_URL.to_string());

    Ok(CrmSettings {
        api_key: non_empty(crm.api_key),
        api_url,
        list: non_empty(crm.list).unwrap_or_else(|| DEFAULT_CRM_LIST.to_string()),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    name: Option<String>,
    tagline: Option<String>,
    environment: Option<String>,
    default_locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCmsSettings {
    url: Option<String>,
    api_key: Option<String>,
    site_id: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawKvSettings {
    url: Option<String>,
    token: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidateSettings {
    secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    response_limit: Option<usize>,
    fallback_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCrmSettings {
    api_key: Option<String>,
    api_url: Option<String>,
    list: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn validated_url(value: Option<String>, key: &'static str) -> Result<Option<String>, LoadError> {
    let Some(value) = non_empty(value) else {
        return Ok(None);
    };
    let parsed =
        Url::parse(&value).map_err(|err| LoadError::invalid(key, format!("`{value}`: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            key,
            format!("`{value}` must use http or https"),
        ));
    }
    Ok(Some(value))
}

fn timeout(value: Option<u64>, key: &'static str) -> Result<Duration, LoadError> {
    match value.unwrap_or(DEFAULT_SOURCE_TIMEOUT_MS) {
        0 => Err(LoadError::invalid(key, "must be greater than zero")),
        millis => Ok(Duration::from_millis(millis)),
    }
}
