use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MetricSample;
use crate::alerts::{Alert, StatusFilter};
use crate::storage::{AlertStore, MetricStore};

use super::thresholds::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        };
        f.write_str(status)
    }
}

/// Overall health with the data it was derived from
///
/// `alerts` holds the active alerts of the reported severity; `metrics` is the
/// latest sample when the system is healthy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<Alert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricSample>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    fn new(status: HealthStatus, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            alerts: Vec::new(),
            metrics: None,
            checked_at: Utc::now(),
        }
    }
}

/// Read-only view deriving [`HealthReport`]s from both stores
#[derive(Clone)]
pub struct HealthReporter {
    metrics: Arc<MetricStore>,
    alerts: Arc<AlertStore>,
}

impl HealthReporter {
    pub fn new(metrics: Arc<MetricStore>, alerts: Arc<AlertStore>) -> Self {
        Self { metrics, alerts }
    }

    pub async fn status(&self) -> HealthReport {
        let Some(latest) = self.metrics.latest().await else {
            return HealthReport::new(HealthStatus::Unknown, "No metrics available");
        };

        let active = self.alerts.list(StatusFilter::Active).await;
        let of_severity = |severity: Severity| -> Vec<Alert> {
            active
                .iter()
                .filter(|alert| alert.severity == severity)
                .cloned()
                .collect()
        };

        let critical = of_severity(Severity::Critical);
        if !critical.is_empty() {
            return HealthReport {
                alerts: critical,
                ..HealthReport::new(HealthStatus::Critical, "System has critical issues")
            };
        }

        let warnings = of_severity(Severity::Warning);
        if !warnings.is_empty() {
            return HealthReport {
                alerts: warnings,
                ..HealthReport::new(HealthStatus::Warning, "System has warnings")
            };
        }

        HealthReport {
            metrics: Some(latest),
            ..HealthReport::new(HealthStatus::Healthy, "System is running normally")
        }
    }
}
