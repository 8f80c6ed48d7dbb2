//! Metric sample endpoints

use axum::{
    Json,
    extract::{Query, State},
};

use crate::MetricSample;
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{MetricsQuery, MetricsResponse},
};
use crate::storage::TimeRange;

/// GET /api/v1/metrics?range=1h
pub async fn get_metrics(
    State(state): State<ApiState>,
    Query(query): Query<MetricsQuery>,
) -> Json<MetricsResponse> {
    let range = query
        .range
        .as_deref()
        .map(TimeRange::parse_lenient)
        .unwrap_or_default();

    let metrics = state.service.get_metrics(range).await;

    Json(MetricsResponse {
        range,
        count: metrics.len(),
        metrics,
    })
}

/// GET /api/v1/metrics/latest
pub async fn get_latest_metrics(State(state): State<ApiState>) -> ApiResult<Json<MetricSample>> {
    state
        .service
        .latest_metrics()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(String::from("no metrics collected yet")))
}
