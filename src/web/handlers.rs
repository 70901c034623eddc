//! Request handlers.

use crate::audio::AudioProxy;
use crate::content::{ContentExpander, ExpandedArticle};
use crate::feed::filter::{self, ArticleQuery};
use crate::feed::{feed_urls_from_json, AggregateLimits, Aggregator, Article, FeedRegistry};
use crate::web::error::ApiError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, RawQuery, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state.
pub struct AppState {
    pub aggregator: Aggregator,
    pub expander: ContentExpander,
    pub proxy: AudioProxy,
    pub registry: RwLock<FeedRegistry>,
    pub limits: AggregateLimits,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
pub struct FeedsResponse {
    pub feeds: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeedRequest {
    pub url: String,
}

/// Body of `POST /api/fetch-articles`.
///
/// `feeds` stays untyped so a missing or malformed list is reported as a
/// feed-list error rather than a generic deserialization failure.
#[derive(Debug, Deserialize)]
pub struct FetchArticlesRequest {
    #[serde(default)]
    pub feeds: serde_json::Value,
    #[serde(flatten)]
    pub query: ArticleQuery,
}

#[derive(Debug, Deserialize)]
pub struct ArticleParams {
    pub url: Option<String>,
    /// Feed entry title, used when the page declares none.
    pub title: Option<String>,
}

/// Health check handler.
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_feeds(State(state): State<SharedState>) -> Json<FeedsResponse> {
    let registry = state.registry.read().await;
    Json(FeedsResponse {
        feeds: registry.feeds().to_vec(),
    })
}

pub async fn add_feed(
    State(state): State<SharedState>,
    body: Result<Json<FeedRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = body?;
    state.registry.write().await.add(&request.url).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn remove_feed(
    State(state): State<SharedState>,
    body: Result<Json<FeedRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = body?;
    let removed = state.registry.write().await.remove(&request.url).await?;
    if !removed {
        tracing::debug!(feed = %request.url, "Remove requested for unknown feed");
    }
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn fetch_articles(
    State(state): State<SharedState>,
    body: Result<Json<FetchArticlesRequest>, JsonRejection>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let Json(request) = body?;
    let feed_urls = feed_urls_from_json(&request.feeds)?;

    let articles = state.aggregator.aggregate(&feed_urls, state.limits).await?;
    Ok(Json(filter::apply(articles, &request.query)))
}

pub async fn fetch_full_article(
    State(state): State<SharedState>,
    params: Result<Query<ArticleParams>, QueryRejection>,
) -> Result<Json<ExpandedArticle>, ApiError> {
    let Query(params) = params?;
    let url = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;

    let expanded = state.expander.expand(url, params.title.as_deref()).await?;
    Ok(Json(expanded))
}

pub async fn proxy_audio(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    Ok(state.proxy.serve(query.as_deref(), range).await?)
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
