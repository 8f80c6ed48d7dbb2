//! Process-wide monitoring service
//!
//! Owns both stores, the alert state machine and the scheduler. Constructed
//! once at startup and shared (behind an `Arc`) with the read API.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::MetricSample;
use crate::actors::{SampleEvent, Scheduler};
use crate::alerts::{Alert, AlertSink, StatusFilter};
use crate::config::Config;
use crate::monitors::{AlertStateMachine, AlertTransition, HealthReport, HealthReporter};
use crate::sources::MetricsSource;
use crate::storage::{AlertStore, MetricStore, TimeRange, open_stores};

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub samples: usize,
    pub alerts_total: usize,
    pub alerts_active: usize,
    pub retention_hours: i64,
    pub max_alerts: usize,
    pub alerts_muted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted_until: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
}

pub struct MonitoringService {
    metrics: Arc<MetricStore>,
    alerts: Arc<AlertStore>,
    machine: Arc<AlertStateMachine>,
    reporter: HealthReporter,
    scheduler: Scheduler,
    started_at: DateTime<Utc>,
}

impl MonitoringService {
    /// Load persisted state and start collecting and evaluating
    pub async fn open(
        config: &Config,
        source: Arc<dyn MetricsSource>,
        sink: Arc<dyn AlertSink>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let (metrics, alerts) = open_stores(&config.storage).await;
        let metrics = Arc::new(metrics);
        let alerts = Arc::new(alerts);

        let machine = Arc::new(AlertStateMachine::new(
            config.thresholds.clone(),
            alerts.clone(),
            sink,
        ));
        let reporter = HealthReporter::new(metrics.clone(), alerts.clone());
        let scheduler = Scheduler::start(&config.schedule, source, metrics.clone(), machine.clone());

        info!(
            "monitoring service started with {} samples and {} alerts",
            metrics.len().await,
            alerts.len().await
        );

        Ok(Self {
            metrics,
            alerts,
            machine,
            reporter,
            scheduler,
            started_at: Utc::now(),
        })
    }

    /// Samples inside `range`, oldest first
    pub async fn get_metrics(&self, range: TimeRange) -> Vec<MetricSample> {
        self.metrics.query_range(range).await
    }

    pub async fn latest_metrics(&self) -> Option<MetricSample> {
        self.metrics.latest().await
    }

    /// Alerts matching `filter`, most recent first
    pub async fn get_alerts(&self, filter: StatusFilter) -> Vec<Alert> {
        self.alerts.list(filter).await
    }

    pub async fn get_health_status(&self) -> HealthReport {
        self.reporter.status().await
    }

    /// Take a sample now instead of waiting for the next collection tick
    pub async fn collect_now(&self) -> anyhow::Result<MetricSample> {
        self.scheduler.collector().collect_now().await
    }

    /// Evaluate the latest sample now instead of waiting for the next tick
    pub async fn evaluate_now(&self) -> anyhow::Result<Vec<AlertTransition>> {
        self.scheduler.evaluator().evaluate_now().await
    }

    pub async fn mute_alerts(&self, duration: Duration) {
        self.machine.mute_for(duration).await;
    }

    pub async fn unmute_alerts(&self) {
        self.machine.unmute().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SampleEvent> {
        self.scheduler.subscribe()
    }

    pub async fn stats(&self) -> ServiceStats {
        let active = self.alerts.list(StatusFilter::Active).await.len();
        let now = Utc::now();

        ServiceStats {
            samples: self.metrics.len().await,
            alerts_total: self.alerts.len().await,
            alerts_active: active,
            retention_hours: self.metrics.retention().num_hours(),
            max_alerts: self.alerts.capacity(),
            alerts_muted: self.machine.is_muted().await,
            muted_until: self.machine.muted_until().await,
            started_at: self.started_at,
            uptime_seconds: (now - self.started_at).num_seconds(),
        }
    }

    /// Stop the background actors; stored state stays readable
    pub async fn shutdown(&self) {
        debug!("shutting down monitoring service");
        self.scheduler.shutdown().await;
    }
}
