pub mod error;
pub mod routes;

use crate::state::OcrServiceState;
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted upload. Phone camera JPEGs sit well under this.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Build the API router
pub fn router(state: OcrServiceState) -> Router {
    Router::new()
        // Health and metrics endpoints
        .route("/healthz", get(routes::healthz))
        .route("/readyz", get(routes::readyz))
        .route("/metrics", get(routes::metrics))
        // Inference endpoint
        .route("/api/plate-ocr", post(routes::plate_ocr))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
