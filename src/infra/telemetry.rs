//! Tracing subscriber and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Client-side HTTP crates log every connection at debug; they stay at info
/// when the configured level is more verbose.
const QUIET_TARGETS: &[&str] = &["hyper_util", "reqwest", "rustls"];

const COUNTERS: &[(&str, &str)] = &[
    (
        "cmsfront_content_resolved_total",
        "Content lookups answered, labelled by content kind and origin.",
    ),
    (
        "cmsfront_content_unresolved_total",
        "Content lookups no source could answer.",
    ),
    (
        "cmsfront_source_failure_total",
        "Failed reads against the KV store or the CMS API.",
    ),
    (
        "cmsfront_cache_response_hit_total",
        "Rendered responses served from memory.",
    ),
    (
        "cmsfront_cache_response_miss_total",
        "Content requests that had to be rendered.",
    ),
    (
        "cmsfront_cache_response_evict_total",
        "Rendered responses pushed out by the size limit.",
    ),
    (
        "cmsfront_revalidate_total",
        "Revalidation webhook calls, labelled by outcome.",
    ),
];

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber. Fails if one is already installed.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(logging.level))
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    if level > LevelFilter::INFO {
        for target in QUIET_TARGETS {
            if let Ok(directive) = format!("{target}=info").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(*name, Unit::Count, *description);
        }
        describe_histogram!(
            "cmsfront_cms_request_ms",
            Unit::Milliseconds,
            "CMS content API request latency."
        );
    });
}
