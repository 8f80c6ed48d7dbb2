//! Per-metric alert lifecycle
//!
//! ```text
//! inactive ──(warning|critical)──▶ active(severity) ──(below warning)──▶ resolved
//! ```
//!
//! Alerts are keyed by (metric, severity): a warning and a critical alert of the
//! same metric may be active at the same time. Falling below the warning
//! threshold resolves every active alert of the metric at once. Only triggers
//! are delivered to the sink; resolutions are recorded and logged.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::MetricSample;
use crate::alerts::{Alert, AlertSink};
use crate::storage::AlertStore;

use super::thresholds::{Metric, Thresholds};

/// Longest a single delivery may take before it is abandoned
pub const NOTIFY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// State change produced by one observation
#[derive(Debug, Clone, PartialEq)]
pub enum AlertTransition {
    Triggered(Alert),
    Resolved(Alert),
}

impl AlertTransition {
    pub fn alert(&self) -> &Alert {
        match self {
            AlertTransition::Triggered(alert) | AlertTransition::Resolved(alert) => alert,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mute {
    Until(DateTime<Utc>),
    Indefinitely,
}

pub struct AlertStateMachine {
    thresholds: Thresholds,
    store: Arc<AlertStore>,
    sink: Arc<dyn AlertSink>,
    notify_timeout: std::time::Duration,

    /// Serializes evaluation passes
    pass: Mutex<()>,

    mute: RwLock<Option<Mute>>,
}

impl AlertStateMachine {
    pub fn new(thresholds: Thresholds, store: Arc<AlertStore>, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            thresholds,
            store,
            sink,
            notify_timeout: NOTIFY_TIMEOUT,
            pass: Mutex::new(()),
            mute: RwLock::new(None),
        }
    }

    pub fn with_notify_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate every configured metric present in `sample`
    ///
    /// Metrics missing from the sample are skipped; they neither trigger nor
    /// resolve alerts.
    #[instrument(skip_all, fields(timestamp = %sample.timestamp))]
    pub async fn evaluate_sample(&self, sample: &MetricSample) -> Vec<AlertTransition> {
        let observations: Vec<_> = self
            .thresholds
            .configured()
            .filter_map(|(metric, _)| match metric.value_in(sample) {
                Some(value) => Some((metric, value)),
                None => {
                    debug!("no value for {metric} in sample, skipping");
                    None
                }
            })
            .collect();

        self.apply(&observations).await
    }

    /// Apply a single observation
    pub async fn observe(&self, metric: Metric, value: f64) -> Vec<AlertTransition> {
        self.apply(&[(metric, value)]).await
    }

    async fn apply(&self, observations: &[(Metric, f64)]) -> Vec<AlertTransition> {
        let transitions = {
            let _pass = self.pass.lock().await;
            let now = Utc::now();

            let mut transitions = Vec::new();
            for &(metric, value) in observations {
                self.transitions_for(metric, value, now, &mut transitions)
                    .await;
            }

            self.store
                .upsert_many(
                    transitions
                        .iter()
                        .map(|transition| transition.alert().clone())
                        .collect(),
                )
                .await;

            transitions
        };

        self.notify(&transitions).await;
        transitions
    }

    async fn transitions_for(
        &self,
        metric: Metric,
        value: f64,
        now: DateTime<Utc>,
        transitions: &mut Vec<AlertTransition>,
    ) {
        let Some(threshold) = self.thresholds.get(metric) else {
            return;
        };

        let active = self.store.active_for(metric).await;

        match threshold.evaluate(value) {
            Some(severity) => {
                if active.iter().any(|alert| alert.severity == severity) {
                    debug!("{metric} already has an active {severity} alert");
                    return;
                }

                let alert = Alert::trigger(metric, severity, value, threshold.level(severity), now);
                warn!(alert_id = %alert.id, "{}", alert.message);
                transitions.push(AlertTransition::Triggered(alert));
            }
            None => {
                for mut alert in active {
                    alert.resolve(now);
                    info!(
                        alert_id = %alert.id,
                        "{metric} recovered to {}, resolved {} alert",
                        metric.format_value(value),
                        alert.severity
                    );
                    transitions.push(AlertTransition::Resolved(alert));
                }
            }
        }
    }

    async fn notify(&self, transitions: &[AlertTransition]) {
        let triggered: Vec<_> = transitions
            .iter()
            .filter_map(|transition| match transition {
                AlertTransition::Triggered(alert) => Some(alert),
                AlertTransition::Resolved(_) => None,
            })
            .collect();

        if triggered.is_empty() {
            return;
        }

        if self.is_muted().await {
            debug!("alerts muted, not notifying {} alerts", triggered.len());
            return;
        }

        for alert in triggered {
            match tokio::time::timeout(self.notify_timeout, self.sink.notify(alert)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    alert_id = %alert.id,
                    "failed to deliver alert via {}: {e:#}",
                    self.sink.name()
                ),
                Err(_) => warn!(
                    alert_id = %alert.id,
                    "delivery via {} timed out after {:?}",
                    self.sink.name(),
                    self.notify_timeout
                ),
            }
        }
    }

    /// Suppress notifications for `duration`; transitions are still recorded
    pub async fn mute_for(&self, duration: Duration) {
        let until = Utc::now() + duration;
        debug!("muting alerts until {until}");
        *self.mute.write().await = Some(Mute::Until(until));
    }

    pub async fn mute(&self) {
        debug!("muting alerts");
        *self.mute.write().await = Some(Mute::Indefinitely);
    }

    pub async fn unmute(&self) {
        debug!("unmuting alerts");
        *self.mute.write().await = None;
    }

    pub async fn is_muted(&self) -> bool {
        match *self.mute.read().await {
            Some(Mute::Indefinitely) => true,
            Some(Mute::Until(until)) => Utc::now() < until,
            None => false,
        }
    }

    /// End of the current mute window, if muted for a limited time
    pub async fn muted_until(&self) -> Option<DateTime<Utc>> {
        match *self.mute.read().await {
            Some(Mute::Until(until)) if Utc::now() < until => Some(until),
            _ => None,
        }
    }
}
