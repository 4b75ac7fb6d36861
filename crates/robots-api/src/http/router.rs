//! Axum router configuration with middleware.
//!
//! All fleet routes are under `/api/v1/`; `/health` sits at the root.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{delete, get, post};
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
        // Robots
        .route(
            "/robots",
            get(handlers::robot::list_robots).post(handlers::robot::create_robot),
        )
        .route(
            "/robots/{name}",
            get(handlers::robot::get_robot)
                .patch(handlers::robot::update_robot)
                .delete(handlers::robot::delete_robot),
        )
        .route("/robots/{name}/status", get(handlers::robot::get_status))
        // Fleet-wide aspects
        .route("/aspects", post(handlers::aspect::add_aspect))
        .route("/aspects/{name}", delete(handlers::aspect::remove_aspect));

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
