//! The router backed by mocked KV (Upstash REST) and CMS content API servers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use httpmock::prelude::*;
use serde_json::{Value, json};
use tower::ServiceExt;

use cmsfront::application::{
    contact::ContactService, fallback::StaticSource, revalidation::RevalidationService,
};
use cmsfront::config::{
    CacheSettings, CmsSettings, CrmSettings, KvSettings, LogFormat, LoggingSettings,
    RevalidateSettings, ServerSettings, Settings, SiteEnvironment, SiteSettings,
};
use cmsfront::infra::clients::{SourceClients, build_resolver};
use cmsfront::infra::http::{HttpState, SiteContext, build_router};
use cmsfront::presentation::blocks::BlockRenderer;

fn settings(kv: Option<&MockServer>, cms: Option<&MockServer>) -> Settings {
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
            name: "Acme".into(),
            tagline: None,
            environment: SiteEnvironment::Production,
            default_locale: "en".into(),
        },
        cms: CmsSettings {
            url: cms.map(MockServer::base_url),
            api_key: cms.map(|_| "cms-key".to_string()),
            site_id: None,
            timeout: Duration::from_secs(2),
        },
        kv: KvSettings {
            url: kv.map(MockServer::base_url),
            token: kv.map(|_| "kv-token".to_string()),
            timeout: Duration::from_secs(2),
        },
        revalidate: RevalidateSettings::default(),
        cache: CacheSettings {
            enabled: false,
            response_limit: 16,
            fallback_ttl: None,
        },
        crm: CrmSettings {
            api_key: None,
            api_url: "https://api.attio.com/v2".into(),
            list: "iv_cms_site".into(),
        },
    }
}

fn router(settings: &Settings) -> Router {
    let clients = Arc::new(SourceClients::new(settings));
    let resolver = build_resolver(clients.clone(), StaticSource::new("Acme", "en"), "en");

    build_router(HttpState {
        site: Arc::new(SiteContext {
            name: "Acme".into(),
            tagline: None,
            locale: "en".into(),
        }),
        resolver: Arc::new(resolver),
        fallback: Arc::new(StaticSource::new("Acme", "en")),
        blocks: BlockRenderer::new(SiteEnvironment::Production),
        clients,
        revalidation: Arc::new(RevalidationService::new(None, None)),
        contact: Arc::new(ContactService::new(None)),
        cache: None,
    })
}

async fn get(router: &Router, path: &str) -> Response {
    router
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

fn origin(response: &Response) -> Option<&str> {
    response
        .headers()
        .get("x-content-origin")
        .and_then(|value| value.to_str().ok())
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

fn pricing_page(title: &str) -> Value {
    json!({
        "id": "p-pricing",
        "slug": "pricing",
        "title": title,
        "status": "published",
        "locale": "en",
        "renderedHtml": format!("<section class=\"pricing\">{title}</section>"),
        "publishedAt": "2024-01-15T00:00:00Z"
    })
}

/// Answers one Upstash command; anything unmatched gets httpmock's 404 and
/// is absorbed as a store failure.
async fn kv_reply(server: &MockServer, command: Value, result: Value) {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .header("authorization", "Bearer kv-token")
                .json_body(command.clone());
            then.status(200).json_body(json!({ "result": result.clone() }));
        })
        .await;
}

#[tokio::test]
async fn kv_snapshot_serves_pages() {
    let kv = MockServer::start_async().await;
    kv_reply(
        &kv,
        json!(["JSON.GET", "page:pricing"]),
        json!(pricing_page("Pricing from KV").to_string()),
    )
    .await;
    kv_reply(&kv, json!(["JSON.GET", "page:en:pricing"]), Value::Null).await;

    let router = router(&settings(Some(&kv), None));
    let response = get(&router, "/pricing").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(origin(&response), Some("kv"));
    assert!(text(response).await.contains("Pricing from KV"));
}

#[tokio::test]
async fn kv_miss_falls_back_to_the_cms() {
    let kv = MockServer::start_async().await;
    kv_reply(&kv, json!(["JSON.GET", "page:en:pricing"]), Value::Null).await;
    kv_reply(&kv, json!(["JSON.GET", "page:pricing"]), Value::Null).await;

    let cms = MockServer::start_async().await;
    let page_mock = cms
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/content/pages/pricing")
                .query_param("locale", "en")
                .header("authorization", "Bearer cms-key");
            then.status(200).json_body(pricing_page("Pricing from CMS"));
        })
        .await;

    let router = router(&settings(Some(&kv), Some(&cms)));
    let response = get(&router, "/pricing").await;

    page_mock.assert_async().await;
    assert_eq!(origin(&response), Some("api"));
    assert!(text(response).await.contains("Pricing from CMS"));
}

#[tokio::test]
async fn failing_sources_fall_back_to_static_content() {
    let kv = MockServer::start_async().await;
    kv.mock_async(|when, then| {
        when.method(POST);
        then.status(500).json_body(json!({"error": "ERR internal"}));
    })
    .await;
    let cms = MockServer::start_async().await;
    cms.mock_async(|when, then| {
        when.method(GET);
        then.status(503).json_body(json!({"error": "maintenance"}));
    })
    .await;

    let router = router(&settings(Some(&kv), Some(&cms)));
    let response = get(&router, "/about").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(origin(&response), Some("static"));
}

#[tokio::test]
async fn cms_home_without_body_keeps_landing_sections() {
    let cms = MockServer::start_async().await;
    cms.mock_async(|when, then| {
        when.method(GET).path("/api/v1/content/pages/home");
        then.status(200).json_body(json!({
            "id": "p-home",
            "slug": "home",
            "title": "Home",
            "status": "published",
            "publishedAt": "2024-01-15T00:00:00Z"
        }));
    })
    .await;

    let router = router(&settings(None, Some(&cms)));
    let response = get(&router, "/").await;

    assert_eq!(origin(&response), Some("api"));
    assert!(text(response).await.contains("Content Management, Simplified"));
}

#[tokio::test]
async fn kv_health_reports_latency_and_last_sync() {
    let kv = MockServer::start_async().await;
    kv_reply(&kv, json!(["PING"]), json!("PONG")).await;
    kv_reply(
        &kv,
        json!(["GET", "site:last-sync"]),
        json!("2024-01-15T10:00:00Z"),
    )
    .await;

    let router = router(&settings(Some(&kv), None));
    let response = get(&router, "/_health/kv").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&text(response).await).expect("json");
    assert_eq!(body["healthy"], json!(true));
    assert!(body["latencyMs"].is_u64());
    assert_eq!(body["lastSync"], json!("2024-01-15T10:00:00Z"));
}

#[tokio::test]
async fn unreachable_kv_is_unhealthy() {
    let kv = MockServer::start_async().await;
    kv.mock_async(|when, then| {
        when.method(POST);
        then.status(401).json_body(json!({"error": "Unauthorized"}));
    })
    .await;

    let router = router(&settings(Some(&kv), None));
    let response = get(&router, "/_health/kv").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = serde_json::from_str(&text(response).await).expect("json");
    assert_eq!(body["healthy"], json!(false));
    assert!(body["error"].is_string());
}
