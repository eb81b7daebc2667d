//! HTTP boundary for the job extraction pipeline.
//!
//! The pipeline itself lives in the `extraction` crate; this crate wires it
//! behind an axum router and enforces job-state preconditions at the edge.

pub mod config;
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use extraction::{Completion, ContentSource, Store};

pub use config::ServerConfig;
pub use routes::AppState;

/// Build the application router over a wired pipeline.
pub fn build_router<C, A, S>(state: AppState<C, A, S>) -> Router
where
    C: ContentSource + 'static,
    A: Completion + 'static,
    S: Store + 'static,
{
    Router::new()
        .route("/health", get(routes::health_handler))
        .route("/jobs", post(routes::register_job_handler))
        .route("/job-extraction", post(routes::extract_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
