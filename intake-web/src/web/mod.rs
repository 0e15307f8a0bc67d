//! Web layer: shared state, handlers and router assembly.
//!
//! Routes:
//! - `GET /`: liveness text
//! - `GET /health`: JSON health check
//! - `POST /submit`: loan application form
//! - anything else: static files from the public directory

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use handlers::{health, liveness, submit, AppState, HealthResponse};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let public = ServeDir::new(&state.config.public_dir);
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health))
        .route("/submit", post(submit))
        .fallback_service(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
