//! Alert records and alert delivery
//!
//! An [`Alert`] is created when a metric first enters a severity band and is
//! resolved once the metric falls below its warning threshold. Delivery goes
//! through the [`AlertSink`] capability; a failed delivery is logged by the
//! caller and never affects the alert's lifecycle.

pub mod desktop;
pub mod webhook;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::AlertTarget;
use crate::discord::DiscordSink;
use crate::monitors::thresholds::{Metric, Severity};

pub use desktop::DesktopSink;
pub use webhook::WebhookSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A triggered threshold breach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub metric: Metric,
    pub severity: Severity,

    /// Value that triggered the alert
    pub value: f64,

    /// Boundary of the severity band that was crossed
    pub threshold: f64,

    pub message: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn trigger(
        metric: Metric,
        severity: Severity,
        value: f64,
        threshold: f64,
        at: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "{metric} is {}, exceeding {severity} threshold of {}",
            metric.format_value(value),
            metric.format_value(threshold)
        );

        Self {
            id: Uuid::new_v4(),
            metric,
            severity,
            value,
            threshold,
            message,
            status: AlertStatus::Active,
            created_at: at,
            resolved_at: None,
        }
    }

    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(at);
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}

/// Status filter for alert queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    Active,
    Resolved,
    All,
}

impl StatusFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        match self {
            StatusFilter::Active => alert.status == AlertStatus::Active,
            StatusFilter::Resolved => alert.status == AlertStatus::Resolved,
            StatusFilter::All => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Active => "active",
            StatusFilter::Resolved => "resolved",
            StatusFilter::All => "all",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StatusFilter::Active),
            "resolved" => Ok(StatusFilter::Resolved),
            "all" => Ok(StatusFilter::All),
            other => anyhow::bail!("unknown alert status '{other}'"),
        }
    }
}

/// Notification transport for triggered alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn notify(&self, alert: &Alert) -> anyhow::Result<()>;
}

/// Writes alerts to the log; used when no transport is configured
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
        warn!(
            alert_id = %alert.id,
            metric = %alert.metric,
            severity = %alert.severity,
            "{}",
            alert.message
        );
        Ok(())
    }
}

/// Delivers every alert to several sinks
///
/// Individual failures are logged. Delivery fails only if every sink failed.
pub struct FanoutSink {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl AlertSink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    #[instrument(skip_all, fields(alert_id = %alert.id))]
    async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
        let mut failed = 0;

        for sink in &self.sinks {
            match sink.notify(alert).await {
                Ok(()) => debug!("delivered alert via {}", sink.name()),
                Err(e) => {
                    failed += 1;
                    warn!("failed to deliver alert via {}: {e:#}", sink.name());
                }
            }
        }

        if !self.sinks.is_empty() && failed == self.sinks.len() {
            anyhow::bail!("all {failed} alert sinks failed");
        }

        Ok(())
    }
}

/// Build the sink for the configured alert targets
///
/// Without any target, alerts are written to the log.
pub fn build_sink(targets: &[AlertTarget]) -> Arc<dyn AlertSink> {
    if targets.is_empty() {
        return Arc::new(LogSink);
    }

    let sinks = targets
        .iter()
        .map(|target| -> Box<dyn AlertSink> {
            match target {
                AlertTarget::Discord(discord) => Box::new(DiscordSink::new(discord.clone())),
                AlertTarget::Webhook(webhook) => Box::new(WebhookSink::new(webhook.url.clone())),
                AlertTarget::Desktop(desktop) => Box::new(DesktopSink::new(desktop.title.clone())),
                AlertTarget::Log => Box::new(LogSink),
            }
        })
        .collect();

    Arc::new(FanoutSink::new(sinks))
}
