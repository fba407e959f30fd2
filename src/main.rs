use std::{process, sync::Arc, time::Duration};

use cmsfront::{
    application::{
        contact::ContactService, error::AppError, fallback::StaticSource, repos::CrmGateway,
        revalidation::RevalidationService,
    },
    cache::{CacheConfig, ResponseCache},
    config::{self, Settings},
    infra::{
        clients::{SourceClients, build_resolver},
        crm::AttioClient,
        error::InfraError,
        http::{self, HttpState, SiteContext},
        telemetry,
    },
    presentation::blocks::BlockRenderer,
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const CRM_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let state = build_http_state(&settings)?;
    serve_http(&settings, state).await
}

fn build_http_state(settings: &Settings) -> Result<HttpState, AppError> {
    let site = &settings.site;
    info!(
        mode = settings.content_mode().as_str(),
        environment = ?site.environment,
        locale = %site.default_locale,
        "content sources configured"
    );

    let clients = Arc::new(SourceClients::new(settings));
    let resolver = build_resolver(
        clients.clone(),
        StaticSource::new(&site.name, &site.default_locale),
        &site.default_locale,
    );

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = cache_config
        .enabled
        .then(|| ResponseCache::new(cache_config));

    if settings.revalidate.secret.is_none() {
        warn!("revalidation secret is not set; the webhook will reject every call");
    }
    let revalidation = RevalidationService::new(settings.revalidate.secret.clone(), cache.clone());

    let crm: Option<Arc<dyn CrmGateway>> = match settings.crm.api_key.as_deref() {
        Some(api_key) => Some(Arc::new(
            AttioClient::new(
                &settings.crm.api_url,
                api_key,
                settings.crm.list.clone(),
                CRM_TIMEOUT,
            )
            .map_err(AppError::from)?,
        )),
        None => None,
    };

    Ok(HttpState {
        site: Arc::new(SiteContext {
            name: site.name.clone(),
            tagline: site.tagline.clone(),
            locale: site.default_locale.clone(),
        }),
        resolver: Arc::new(resolver),
        fallback: Arc::new(StaticSource::new(&site.name, &site.default_locale)),
        blocks: BlockRenderer::new(site.environment),
        clients,
        revalidation: Arc::new(revalidation),
        contact: Arc::new(ContactService::new(crm)),
        cache,
    })
}

async fn serve_http(settings: &Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Resolves on ctrl-c. In-flight requests then get `grace` to finish before
/// the process is forced down.
async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(grace_seconds = grace.as_secs(), "shutting down");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!("graceful shutdown timed out");
        process::exit(0);
    });
}
