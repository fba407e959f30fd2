use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cmsfront_types::{
    ContactRequest, ContactResponse, FieldIssue, KvHealth, RevalidateHealth, RevalidateResponse,
    WebhookPayload,
};
use serde_json::Value;
use tracing::error;

use crate::application::{
    contact::SUCCESS_MESSAGE,
    error::{ApiError, ErrorReport},
    revalidation::RevalidateRejection,
};

use super::public::HttpState;

const REVALIDATE_SECRET_HEADER: HeaderName = HeaderName::from_static("x-revalidate-secret");

const SOURCE_REVALIDATE: &str = "infra::http::api::revalidate";
const SOURCE_CONTACT: &str = "infra::http::api::contact";
const CONTACT_FAILURE: &str = "An error occurred processing your request. Please try again.";

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/api/revalidate", post(revalidate).get(revalidate_health))
        .route("/api/contact", post(contact))
        .route("/_health/kv", get(kv_health))
}

async fn revalidate(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RevalidateResponse>, ApiError> {
    let provided = headers
        .get(&REVALIDATE_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    state
        .revalidation
        .authorize(provided)
        .map_err(|rejection| match rejection {
            RevalidateRejection::NotConfigured => ApiError::new(
                SOURCE_REVALIDATE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Revalidation not configured",
                rejection.to_string(),
            ),
            RevalidateRejection::InvalidSecret => ApiError::new(
                SOURCE_REVALIDATE,
                StatusCode::UNAUTHORIZED,
                "Invalid secret",
                rejection.to_string(),
            ),
        })?;

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|err| {
        error!(error = %err, "failed to parse revalidation webhook");
        ApiError::new(
            SOURCE_REVALIDATE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Revalidation failed",
            "invalid webhook payload",
        )
        .with_message("Invalid webhook payload")
        .with_cause(&err)
    })?;

    Ok(Json(state.revalidation.revalidate(&payload)))
}

async fn revalidate_health() -> Json<RevalidateHealth> {
    Json(RevalidateHealth {
        status: "ok".to_string(),
        endpoint: "revalidate".to_string(),
    })
}

async fn contact(State(state): State<HttpState>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(err) => {
            error!(error = %err, "contact form body is not json");
            return contact_failure(&err);
        }
    };

    // Fields of the wrong JSON type are a form problem, not a server one.
    let request: ContactRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(err) => {
            return contact_invalid(vec![FieldIssue {
                path: "body".to_string(),
                message: err.to_string(),
            }]);
        }
    };

    match state.contact.submit(request) {
        Ok(_receipt) => Json(ContactResponse {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            errors: None,
        })
        .into_response(),
        Err(issues) => contact_invalid(issues),
    }
}

fn contact_invalid(issues: Vec<FieldIssue>) -> Response {
    let detail = issues
        .iter()
        .map(|issue| format!("{}: {}", issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("; ");
    let mut response = (
        StatusCode::BAD_REQUEST,
        Json(ContactResponse {
            success: false,
            message: "Validation error".to_string(),
            errors: Some(issues),
        }),
    )
        .into_response();
    ErrorReport::from_message(SOURCE_CONTACT, StatusCode::BAD_REQUEST, detail)
        .attach(&mut response);
    response
}

fn contact_failure(err: &serde_json::Error) -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let mut response = (
        status,
        Json(ContactResponse {
            success: false,
            message: CONTACT_FAILURE.to_string(),
            errors: None,
        }),
    )
        .into_response();
    ErrorReport::from_error(SOURCE_CONTACT, status, err).attach(&mut response);
    response
}

async fn kv_health(State(state): State<HttpState>) -> (StatusCode, Json<KvHealth>) {
    let Some(kv) = state.clients.kv() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(KvHealth {
                healthy: false,
                latency_ms: None,
                error: Some("kv store is not configured".to_string()),
                last_sync: None,
            }),
        );
    };

    let (mut health, last_sync) = futures::join!(kv.health(), kv.last_sync());
    health.last_sync = last_sync;
    let status = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}
