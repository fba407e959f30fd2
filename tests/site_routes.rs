//! Rendering of the public site when neither the KV store nor the CMS is
//! configured: every route is answered from the bundled static content.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
    response::Response,
};
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

fn static_settings() -> Settings {
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
            tagline: Some("Content, simplified".into()),
            environment: SiteEnvironment::Production,
            default_locale: "en".into(),
        },
        cms: CmsSettings {
            url: None,
            api_key: None,
            site_id: None,
            timeout: Duration::from_secs(1),
        },
        kv: KvSettings {
            url: None,
            token: None,
            timeout: Duration::from_secs(1),
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

fn router() -> Router {
    let settings = static_settings();
    let clients = Arc::new(SourceClients::new(&settings));
    let resolver = build_resolver(clients.clone(), StaticSource::new("Acme", "en"), "en");

    build_router(HttpState {
        site: Arc::new(SiteContext {
            name: "Acme".into(),
            tagline: Some("Content, simplified".into()),
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

async fn post_json(router: &Router, path: &str, body: Value) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(path)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

async fn json_body(response: Response) -> Value {
    serde_json::from_str(&text(response).await).expect("json body")
}

#[tokio::test]
async fn home_renders_static_landing_blocks() {
    let router = router();
    let response = get(&router, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-content-origin")
            .and_then(|value| value.to_str().ok()),
        Some("static")
    );
    assert!(response.headers().get("x-request-id").is_some());

    let html = text(response).await;
    assert!(html.contains("Content Management, Simplified"));
    assert!(html.contains("block-content"));
    assert!(html.contains("Acme"));
    // static navigation
    assert!(html.contains("href=\"/capabilities\""));
}

#[tokio::test]
async fn forwarded_request_id_is_echoed() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "edge-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("edge-123")
    );
}

#[tokio::test]
async fn unknown_page_is_not_found() {
    let response = get(&router(), "/no-such-page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(text(response).await.contains("Page Not Found"));
}

#[tokio::test]
async fn perspectives_listing_links_articles() {
    let router = router();
    let html = text(get(&router, "/perspectives").await).await;

    assert!(html.contains("Perspectives"));
    assert!(html.contains("href=\"/perspectives/article-1\""));
    assert!(html.contains("Insights"));

    let first = html.find("Article One").expect("article one listed");
    let third = html.find("Article Three").expect("article three listed");
    assert!(first < third, "newest article comes first");
}

#[tokio::test]
async fn perspective_article_renders_body_and_back_link() {
    let router = router();
    let response = get(&router, "/perspectives/article-1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = text(response).await;
    assert!(html.contains("Article One"));
    assert!(html.contains("<h2>Conclusion</h2>"));
    assert!(html.contains("href=\"/perspectives\""));
}

#[tokio::test]
async fn unknown_perspective_is_not_found() {
    let response = get(&router(), "/perspectives/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn solutions_are_listed_without_detail_links() {
    let html = text(get(&router(), "/solutions").await).await;
    assert!(html.contains("Solution One"));
    assert!(!html.contains("href=\"/solutions/solution-1\""));
}

#[tokio::test]
async fn revalidate_health_check() {
    let response = get(&router(), "/api/revalidate").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"status": "ok", "endpoint": "revalidate"})
    );
}

#[tokio::test]
async fn kv_health_without_kv_is_unavailable() {
    let response = get(&router(), "/_health/kv").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["healthy"], json!(false));
}

#[tokio::test]
async fn contact_form_accepts_valid_submission() {
    let response = post_json(
        &router(),
        "/api/contact",
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "message": "We would like a demo for our team."
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn contact_form_reports_field_issues() {
    let response = post_json(
        &router(),
        "/api/contact",
        json!({
            "firstName": "",
            "lastName": "Lovelace",
            "email": "not-an-email",
            "message": "short"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Validation error"));

    let paths: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .filter_map(|issue| issue["path"].as_str())
        .collect();
    assert!(paths.contains(&"firstName"));
    assert!(paths.contains(&"email"));
    assert!(paths.contains(&"message"));
}

#[tokio::test]
async fn contact_form_rejects_non_json_with_generic_message() {
    let response = router()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/contact")
                .body(Body::from("firstName=Ada"))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(!body["message"].as_str().unwrap_or_default().contains("expected"));
}
