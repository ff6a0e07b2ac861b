pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analyze", post(handlers::handle_analyze))
        .route("/api/v1/cache/stats", get(handlers::handle_cache_stats))
        .route("/api/v1/cache", delete(handlers::handle_clear_cache))
        .with_state(state)
}
