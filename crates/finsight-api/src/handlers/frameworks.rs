//! Valuation framework catalogue handler.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use finsight_core::{InstrumentType, ValuationFramework};
use finsight_knowledge::frameworks_for;

use crate::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct FrameworksQuery {
    pub sector: Option<String>,
    pub region: Option<String>,
}

/// `GET /frameworks/:instrument_type` — built-in valuation framework
/// catalogue for one instrument type.
pub async fn get_frameworks(
    State(_state): State<AppState>,
    Path(instrument_type): Path<String>,
    Query(query): Query<FrameworksQuery>,
) -> Result<Json<ApiResponse<Vec<ValuationFramework>>>, ApiError> {
    let instrument_type: InstrumentType =
        instrument_type.parse().map_err(ApiError::BadRequest)?;

    let frameworks = frameworks_for(
        instrument_type,
        query.sector.as_deref(),
        query.region.as_deref(),
    );
    Ok(Json(ApiResponse::ok(frameworks)))
}
