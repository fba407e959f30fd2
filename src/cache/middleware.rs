//! Response cache middleware for content routes.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use super::{CachedResponse, ResponseCache, ResponseKey, deps};

const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");
const MAX_CACHED_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Serve GET requests from the response cache and store fresh 200 responses
/// together with the content tags recorded while rendering them.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<ResponseCache>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.is_enabled() || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseKey::new(
        request.uri().path(),
        request.uri().query().unwrap_or(""),
    );

    if let Some(cached) = cache.lookup(&key) {
        debug!(outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    debug!(outcome = "miss", "cache miss, executing handler");
    let generation = cache.generation();
    let (response, tags) = deps::with_collector(next.run(request)).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer response body for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect();

    let stored = cache.insert_if_unchanged(
        key,
        CachedResponse::new(200, headers, bytes.clone()),
        tags,
        generation,
    );
    if stored {
        debug!("caching response");
    } else {
        debug!("content invalidated during render, response not cached");
    }

    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("miss"));
    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .header(CACHE_STATUS_HEADER, HeaderValue::from_static("hit"))
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
