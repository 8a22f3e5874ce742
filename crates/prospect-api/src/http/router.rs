//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/` except `/health`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Salesperson ingress
        .route(
            "/chats/{chat_id}/messages",
            post(handlers::message::post_message),
        )
        // Session lifecycle
        .route(
            "/chats/{chat_id}/start",
            post(handlers::session::start_session),
        )
        .route(
            "/chats/{chat_id}/reset",
            post(handlers::session::reset_session),
        )
        .route(
            "/chats/{chat_id}/session",
            get(handlers::session::get_session),
        )
        // Live reply stream
        .route("/chats/{chat_id}/events", get(handlers::events::chat_events))
        // Reporting
        .route(
            "/runs/{run_id}/messages",
            get(handlers::report::run_messages),
        )
        .route("/stats", get(handlers::report::get_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
