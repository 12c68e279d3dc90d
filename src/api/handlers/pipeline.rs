//! Handler exposing the click pipeline state.

use axum::{Json, extract::State};

use crate::domain::click_pipeline::PipelineStats;
use crate::state::AppState;

/// `GET /api/pipeline`: queue depth, worker counts and batching settings.
pub async fn pipeline_stats_handler(State(state): State<AppState>) -> Json<PipelineStats> {
    Json(state.click_pipeline.stats())
}
