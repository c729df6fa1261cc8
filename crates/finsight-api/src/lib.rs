//! # finsight-api
//!
//! HTTP surface for finsight. All responses share one envelope:
//! `{ "success": bool, "data": … | "error": "…", "timestamp": RFC3339 }`.

pub mod handlers;
pub mod response;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use finsight_core::defaults::{CORS_MAX_AGE_SECS, MAX_BODY_SIZE_BYTES};

pub use response::{ApiError, ApiResponse};
pub use state::AppState;

/// Build the application router with all middleware layers.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::permissive()
        .max_age(std::time::Duration::from_secs(CORS_MAX_AGE_SECS));

    Router::new()
        .route("/health", get(handlers::system::health))
        .route("/documents/upload", post(handlers::documents::upload_document))
        .route("/documents/jobs/:id", get(handlers::documents::get_job))
        .route("/knowledge/search", post(handlers::knowledge::search_knowledge))
        .route("/analysis/enhanced", post(handlers::analysis::enhanced_analysis))
        .route("/frameworks/:instrument_type", get(handlers::frameworks::get_frameworks))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE_BYTES))
        .with_state(state)
}
