//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::state::ApiState;
use crate::monitors::HealthReport;

/// GET /api/v1/health
///
/// Always answers 200; the health itself is in the body's `status`.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthReport> {
    Json(state.service.get_health_status().await)
}
