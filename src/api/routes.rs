//! API Routes
//!
//! Configures the Axum router with all cache service endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, delete_pattern_handler, get_handler, health_handler,
    set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Cache a JSON value
/// - `DELETE /cache?pattern=<glob>` - Delete every key matching a glob
/// - `GET /cache/:key` - Retrieve a value by key
/// - `DELETE /cache/:key` - Delete a key
/// - `POST /clear` - Empty both tiers
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", put(set_handler).delete(delete_pattern_handler))
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/clear", post(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
