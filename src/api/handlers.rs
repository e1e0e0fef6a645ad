//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::{CacheStats, TieredCache};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    validate_key, GetResponse, HealthResponse, MessageResponse, PatternQuery, SetRequest,
};

/// Convenience Result type for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Application state shared across all handlers.
///
/// Holds the cache handle injected at startup; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub cache: TieredCache,
}

impl AppState {
    pub fn new(cache: TieredCache) -> Self {
        Self { cache }
    }

    /// Builds a cache from configuration. The primary store is not connected
    /// until `cache.init()` or `cache.spawn_init()` runs.
    pub fn from_config(config: &Config) -> Self {
        Self::new(TieredCache::new(config.cache_config()))
    }
}

/// Handler for PUT /cache
///
/// Caches a JSON value. Oversized values are accepted but not cached.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    state.cache.set(&req.key, &req.value, req.ttl).await;

    Ok(Json(MessageResponse::set(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<GetResponse>> {
    let value = state
        .cache
        .get::<Value>(&key)
        .await
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
///
/// Succeeds whether or not the key was cached.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    state.cache.delete(&key).await;

    Ok(Json(MessageResponse::deleted(key)))
}

/// Handler for DELETE /cache?pattern=<glob>
pub async fn delete_pattern_handler(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let pattern = query
        .pattern
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("Query parameter 'pattern' is required".to_string()))?;

    state.cache.delete_pattern(&pattern).await;

    Ok(Json(MessageResponse::pattern_deleted(pattern)))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.clear().await;
    Json(MessageResponse::cleared())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.primary_state()))
}
