mod api;
mod middleware;
mod public;

pub use public::{HttpState, SiteContext, build_router};

use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;

use crate::application::sources::ContentOrigin;

/// Which source answered the page's primary content.
pub const CONTENT_ORIGIN_HEADER: HeaderName = HeaderName::from_static("x-content-origin");

fn with_origin(mut response: Response, origin: ContentOrigin) -> Response {
    response.headers_mut().insert(
        CONTENT_ORIGIN_HEADER,
        HeaderValue::from_static(origin.as_str()),
    );
    response
}
