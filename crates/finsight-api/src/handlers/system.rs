//! Health and system info.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::{ApiResponse, AppState};

/// Service health and configuration summary.
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    Json(ApiResponse::ok(json!({
        "status": "ok",
        "service": "finsight-api",
        "version": env!("CARGO_PKG_VERSION"),
        "embedding_model": state.embedder.model_name(),
        "target_dimensions": state.embedder.target_dimensions(),
    })))
}
