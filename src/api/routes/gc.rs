//! Manual garbage collection

use axum::{Json, extract::State};
use tracing::info;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::store::SweepReport;

/// POST /api/v1/gc
///
/// Sweeps immediately, regardless of the configured GC interval
pub async fn run_gc(State(state): State<ApiState>) -> ApiResult<Json<SweepReport>> {
    info!("manual gc requested");
    let report = state
        .registry
        .sweep(true)
        .await?
        .ok_or_else(|| ApiError::Internal("forced sweep did not run".to_string()))?;
    Ok(Json(report))
}
