use crate::api::{handlers, AppState};
use crate::metrics::track_metrics;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Town search
        .route("/v1/towns/search", get(handlers::search_towns))
        // Town management
        .route(
            "/v1/users/:owner/towns",
            get(handlers::list_towns).post(handlers::create_town),
        )
        .route(
            "/v1/users/:owner/towns/:town_id",
            get(handlers::get_town)
                .put(handlers::update_town)
                .delete(handlers::delete_town),
        )
        // Index administration
        .route("/v1/admin/search/full-reindex", post(handlers::trigger_full_reindex))
        .route("/v1/admin/search/delta-reindex", post(handlers::trigger_delta_reindex))
        .route("/v1/admin/search/sweep", post(handlers::sweep_orphans))
        .route("/v1/admin/search/status", get(handlers::index_status))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new().include_headers(false)),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}
