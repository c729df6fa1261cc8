//! Enhanced analysis handler.

use axum::extract::State;
use axum::Json;

use finsight_core::{AnalysisContext, EnhancedAnalysis};

use crate::{ApiError, ApiResponse, AppState};

/// `POST /analysis/enhanced` — structured analysis from instrument, market,
/// and fundamental data. A degraded analysis (unparseable generative reply)
/// is still a successful response; the `degraded` flag and preserved raw
/// text tell the caller what happened.
pub async fn enhanced_analysis(
    State(state): State<AppState>,
    Json(context): Json<AnalysisContext>,
) -> Result<Json<ApiResponse<EnhancedAnalysis>>, ApiError> {
    if context.symbol.trim().is_empty() {
        return Err(ApiError::BadRequest("symbol must not be empty".to_string()));
    }

    let analysis = state.analysis.generate_enhanced_analysis(&context).await;
    Ok(Json(ApiResponse::ok(analysis)))
}
