//! API request and response bodies

use serde::{Deserialize, Serialize};

use crate::MetricSample;
use crate::alerts::{Alert, StatusFilter};
use crate::storage::TimeRange;

/// Query parameters of `GET /api/v1/metrics`
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    /// `1h`, `6h` or `24h`; anything else means one hour
    pub range: Option<String>,
}

/// Query parameters of `GET /api/v1/alerts`
#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    /// `active` (default), `resolved` or `all`
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub range: TimeRange,
    pub count: usize,
    pub metrics: Vec<MetricSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub status: StatusFilter,
    pub count: usize,
    pub alerts: Vec<Alert>,
}
