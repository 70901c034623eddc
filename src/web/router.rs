//! Router configuration.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::cors::create_cors_layer;
use super::handlers::{
    add_feed, fetch_articles, fetch_full_article, health_check, list_feeds, not_found,
    proxy_audio, remove_feed, SharedState,
};

/// Create the application router.
///
/// Article expansion and the audio proxy answer both on their historical
/// root paths and under `/api`.
pub fn create_router(state: SharedState, cors_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/fetch-articles", post(fetch_articles))
        .route("/fetch-article-content", get(fetch_full_article))
        .route("/proxy-audio", get(proxy_audio));

    Router::new()
        .route("/health", get(health_check))
        .route("/feeds", get(list_feeds).post(add_feed).delete(remove_feed))
        .route("/fetch-full-article", get(fetch_full_article))
        .route("/proxy-audio", get(proxy_audio))
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(create_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
