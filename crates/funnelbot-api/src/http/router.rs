//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/webhook/inbound", post(handlers::webhook::receive_inbound))
        .route("/conversations/{user_id}", get(handlers::conversation::get_conversation))
        .route(
            "/conversations/{user_id}/release",
            post(handlers::conversation::release_conversation),
        )
        .route("/metrics", get(handlers::stats::get_metrics))
        .route("/health", get(handlers::stats::health));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
