use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::endpoint::Endpoint;
use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Query endpoints ─────────────────────────────────────
        .route(&Endpoint::Query.path(), get(handlers::query::query))
        .route("/api/query/chunk", get(handlers::query::query_chunk))
        // ── Metric metadata ─────────────────────────────────────
        .route(&Endpoint::MetricList.path(), get(handlers::metrics::metrics_list))
        .route(&Endpoint::Metric.path(), get(handlers::metrics::metric))
        .route(&Endpoint::ResetFlood.path(), post(handlers::reset::reset_flood))
        // ── Collector views ─────────────────────────────────────
        .route("/api/stats", get(stream::get_stats))
        .route("/api/stats/stream", get(stream::stats_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::endpoint_stat_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
