//! Knowledge search handler.

use axum::extract::State;
use axum::Json;

use finsight_core::{KnowledgeQuery, KnowledgeResult};

use crate::{ApiError, ApiResponse, AppState};

/// `POST /knowledge/search` — ranked knowledge results for a semantic
/// query. Provider failures degrade to an empty result set inside the
/// service, so this endpoint stays available.
pub async fn search_knowledge(
    State(state): State<AppState>,
    Json(query): Json<KnowledgeQuery>,
) -> Result<Json<ApiResponse<Vec<KnowledgeResult>>>, ApiError> {
    if let Some(min_score) = query.min_score {
        if !(0.0..=1.0).contains(&min_score) {
            return Err(ApiError::BadRequest(
                "min_score must be within [0, 1]".to_string(),
            ));
        }
    }

    let results = state.knowledge.search_knowledge(&query).await?;
    Ok(Json(ApiResponse::ok(results)))
}
