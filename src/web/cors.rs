//! CORS configuration.

use axum::http::header::{ACCEPT, CONTENT_TYPE, RANGE};
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// Response headers the audio player needs to read cross-origin.
const EXPOSED_HEADERS: [HeaderName; 3] = [
    axum::http::header::CONTENT_RANGE,
    axum::http::header::ACCEPT_RANGES,
    axum::http::header::CONTENT_LENGTH,
];

/// Create a CORS layer allowing the given origins.
///
/// An empty list, or one where no origin parses, allows any origin.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.trim().trim_end_matches('/').parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(methods)
        .expose_headers(EXPOSED_HEADERS);

    if parsed_origins.is_empty() {
        if !origins.is_empty() {
            tracing::warn!(origins = ?origins, "No valid CORS origin configured, allowing any");
        }
        layer.allow_headers(Any).allow_origin(Any)
    } else {
        layer
            .allow_headers([CONTENT_TYPE, ACCEPT, RANGE])
            .allow_origin(parsed_origins)
    }
}
