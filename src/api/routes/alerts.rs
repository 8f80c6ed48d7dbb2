//! Alert history endpoint

use axum::{
    Json,
    extract::{Query, State},
};

use crate::alerts::StatusFilter;
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{AlertsQuery, AlertsResponse},
};

/// GET /api/v1/alerts?status=active
///
/// Unknown status values are rejected with 400.
pub async fn get_alerts(
    State(state): State<ApiState>,
    Query(query): Query<AlertsQuery>,
) -> ApiResult<Json<AlertsResponse>> {
    let status = match query.status.as_deref() {
        Some(raw) => raw
            .parse::<StatusFilter>()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
        None => StatusFilter::default(),
    };

    let alerts = state.service.get_alerts(status).await;

    Ok(Json(AlertsResponse {
        status,
        count: alerts.len(),
        alerts,
    }))
}
