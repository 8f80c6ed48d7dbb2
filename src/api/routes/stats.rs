//! Service statistics endpoint

use axum::{Json, extract::State};

use crate::api::state::ApiState;
use crate::service::ServiceStats;

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<ApiState>) -> Json<ServiceStats> {
    Json(state.service.stats().await)
}
