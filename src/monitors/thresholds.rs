//! Threshold evaluation
//!
//! Maps a metric value onto a [`Severity`] band. Evaluation is a pure function
//! of the configured [`Threshold`] and the value; it holds no state and has no
//! side effects.
//!
//! ```text
//! value >= critical            → Some(Severity::Critical)
//! warning <= value < critical  → Some(Severity::Warning)
//! value < warning              → None
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MetricSample;

/// Metrics the alerting engine knows how to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
    ErrorRate,
    Latency,
}

impl Metric {
    /// Evaluation order within one pass
    pub const ALL: [Metric; 5] = [
        Metric::Cpu,
        Metric::Memory,
        Metric::Disk,
        Metric::ErrorRate,
        Metric::Latency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Disk => "disk",
            Metric::ErrorRate => "error_rate",
            Metric::Latency => "latency",
        }
    }

    /// Dotted name of the sample value this metric is evaluated on
    pub fn sample_key(&self) -> &'static str {
        match self {
            Metric::Cpu => "cpu.usage_percent",
            Metric::Memory => "memory.usage_percent",
            Metric::Disk => "disk.usage_percent",
            Metric::ErrorRate => "application.error_rate",
            Metric::Latency => "application.avg_latency_ms",
        }
    }

    pub fn value_in(&self, sample: &MetricSample) -> Option<f64> {
        sample.get(self.sample_key())
    }

    /// Human-readable rendering of a value of this metric
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Metric::Cpu | Metric::Memory | Metric::Disk => format!("{value:.2}%"),
            Metric::ErrorRate => format!("{:.2}%", value * 100.0),
            Metric::Latency => format!("{value:.0}ms"),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown metric '{s}'"))
    }
}

/// Ordered level of concern; "none" is represented as `Option::None`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning and critical boundaries of a single metric (higher is worse)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
}

impl Threshold {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    pub fn evaluate(&self, value: f64) -> Option<Severity> {
        if value.is_nan() {
            return None;
        }

        if value >= self.critical {
            Some(Severity::Critical)
        } else if value >= self.warning {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    /// The boundary that has to be crossed to reach `severity`
    pub fn level(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Warning => self.warning,
            Severity::Critical => self.critical,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.warning.is_finite() || !self.critical.is_finite() {
            anyhow::bail!("thresholds must be finite numbers");
        }
        if self.warning < 0.0 || self.critical < 0.0 {
            anyhow::bail!("thresholds must not be negative");
        }
        if self.warning > self.critical {
            anyhow::bail!(
                "warning threshold ({}) exceeds critical threshold ({})",
                self.warning,
                self.critical
            );
        }
        Ok(())
    }
}

/// Configured thresholds, one optional entry per [`Metric`]
///
/// A metric set to `null` in the configuration is unconfigured and never
/// produces an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// CPU usage in percent (default 70 / 90)
    #[serde(default = "default_cpu")]
    pub cpu: Option<Threshold>,

    /// Memory usage in percent (default 80 / 95)
    #[serde(default = "default_memory")]
    pub memory: Option<Threshold>,

    /// Usage of the first disk in percent (default 80 / 95)
    #[serde(default = "default_disk")]
    pub disk: Option<Threshold>,

    /// Application error rate as a fraction (default 0.05 / 0.10)
    #[serde(default = "default_error_rate")]
    pub error_rate: Option<Threshold>,

    /// Average request latency in milliseconds (default 1000 / 2000)
    #[serde(default = "default_latency")]
    pub latency: Option<Threshold>,
}

fn default_cpu() -> Option<Threshold> {
    Some(Threshold::new(70.0, 90.0))
}

fn default_memory() -> Option<Threshold> {
    Some(Threshold::new(80.0, 95.0))
}

fn default_disk() -> Option<Threshold> {
    Some(Threshold::new(80.0, 95.0))
}

fn default_error_rate() -> Option<Threshold> {
    Some(Threshold::new(0.05, 0.10))
}

fn default_latency() -> Option<Threshold> {
    Some(Threshold::new(1000.0, 2000.0))
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: default_cpu(),
            memory: default_memory(),
            disk: default_disk(),
            error_rate: default_error_rate(),
            latency: default_latency(),
        }
    }
}

impl Thresholds {
    /// No metric configured
    pub fn none() -> Self {
        Self {
            cpu: None,
            memory: None,
            disk: None,
            error_rate: None,
            latency: None,
        }
    }

    pub fn with(mut self, metric: Metric, threshold: Threshold) -> Self {
        *self.slot(metric) = Some(threshold);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<&Threshold> {
        match metric {
            Metric::Cpu => self.cpu.as_ref(),
            Metric::Memory => self.memory.as_ref(),
            Metric::Disk => self.disk.as_ref(),
            Metric::ErrorRate => self.error_rate.as_ref(),
            Metric::Latency => self.latency.as_ref(),
        }
    }

    fn slot(&mut self, metric: Metric) -> &mut Option<Threshold> {
        match metric {
            Metric::Cpu => &mut self.cpu,
            Metric::Memory => &mut self.memory,
            Metric::Disk => &mut self.disk,
            Metric::ErrorRate => &mut self.error_rate,
            Metric::Latency => &mut self.latency,
        }
    }

    /// Configured metrics in evaluation order
    pub fn configured(&self) -> impl Iterator<Item = (Metric, &Threshold)> {
        Metric::ALL
            .into_iter()
            .filter_map(|metric| self.get(metric).map(|threshold| (metric, threshold)))
    }

    pub fn evaluate(&self, metric: Metric, value: f64) -> Option<Severity> {
        self.get(metric)?.evaluate(value)
    }

    /// Same as [`Thresholds::evaluate`], by metric name. Unknown names yield `None`.
    pub fn evaluate_named(&self, metric: &str, value: f64) -> Option<Severity> {
        let metric = metric.parse::<Metric>().ok()?;
        self.evaluate(metric, value)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (metric, threshold) in self.configured() {
            threshold
                .validate()
                .map_err(|e| anyhow::anyhow!("invalid threshold for {metric}: {e}"))?;
        }
        Ok(())
    }
}
