pub mod actors;
pub mod alerts;
pub mod api;
pub mod config;
pub mod discord;
pub mod monitors;
pub mod service;
pub mod sources;
pub mod storage;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// One timestamped snapshot of system and application state.
///
/// Every probe group is optional: a probe that failed while the sample was
/// taken leaves its group empty instead of failing the whole sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub system: SystemMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub usage_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total_mb: u64,
    pub used_mb: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub total_gb: u64,
    pub used_gb: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMetrics {
    pub error_count: u64,
    pub total_requests: u64,
    /// `error_count / total_requests`, 0 when there were no requests
    pub error_rate: f64,
    pub uptime_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
}

impl MetricSample {
    pub fn new(
        timestamp: DateTime<Utc>,
        system: SystemMetrics,
        application: Option<ApplicationMetrics>,
    ) -> Self {
        Self {
            timestamp,
            system,
            application,
        }
    }

    /// Resolve a dotted sub-metric name (e.g. `cpu.usage_percent`) to its value.
    ///
    /// Returns `None` for unknown names and for groups missing from this sample.
    pub fn get(&self, name: &str) -> Option<f64> {
        let system = &self.system;
        let application = self.application.as_ref();

        match name {
            "cpu.usage_percent" => system.cpu.as_ref().map(|cpu| cpu.usage_percent),
            "cpu.load_average" => system.cpu.as_ref().and_then(|cpu| cpu.load_average),
            "memory.usage_percent" => system.memory.as_ref().map(|mem| mem.usage_percent),
            "memory.used_mb" => system.memory.as_ref().map(|mem| mem.used_mb as f64),
            "memory.total_mb" => system.memory.as_ref().map(|mem| mem.total_mb as f64),
            "disk.usage_percent" => system.disk.as_ref().map(|disk| disk.usage_percent),
            "disk.used_gb" => system.disk.as_ref().map(|disk| disk.used_gb as f64),
            "disk.total_gb" => system.disk.as_ref().map(|disk| disk.total_gb as f64),
            "network.bytes_in" => system.network.as_ref().map(|net| net.bytes_in as f64),
            "network.bytes_out" => system.network.as_ref().map(|net| net.bytes_out as f64),
            "application.error_count" => application.map(|app| app.error_count as f64),
            "application.total_requests" => application.map(|app| app.total_requests as f64),
            "application.error_rate" => application.map(|app| app.error_rate),
            "application.uptime_seconds" => application.map(|app| app.uptime_seconds),
            "application.avg_latency_ms" => application.and_then(|app| app.avg_latency_ms),
            _ => None,
        }
    }
}

impl CpuMetrics {
    pub fn new(usage_percent: f64, load_average: Option<f64>) -> Self {
        Self {
            usage_percent: usage_percent.max(0.0),
            load_average: load_average.map(|load| load.max(0.0)),
        }
    }
}

impl MemoryMetrics {
    /// Build from raw byte counts. `None` if the total is unknown (zero).
    pub fn from_bytes(total: u64, used: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }

        Some(Self {
            total_mb: total / BYTES_PER_MB,
            used_mb: used / BYTES_PER_MB,
            usage_percent: used as f64 / total as f64 * 100.0,
        })
    }
}

impl DiskMetrics {
    /// Build from raw byte counts. `None` if the total is unknown (zero).
    pub fn from_bytes(total: u64, used: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }

        Some(Self {
            total_gb: total / BYTES_PER_GB,
            used_gb: used / BYTES_PER_GB,
            usage_percent: used as f64 / total as f64 * 100.0,
        })
    }
}

impl ApplicationMetrics {
    pub fn new(error_count: u64, total_requests: u64, uptime_seconds: f64) -> Self {
        let error_rate = if total_requests == 0 {
            0.0
        } else {
            (error_count as f64 / total_requests as f64).min(1.0)
        };

        Self {
            error_count,
            total_requests,
            error_rate,
            uptime_seconds: uptime_seconds.max(0.0),
            avg_latency_ms: None,
        }
    }

    pub fn with_latency(mut self, avg_latency_ms: Option<f64>) -> Self {
        self.avg_latency_ms = avg_latency_ms.map(|latency| latency.max(0.0));
        self
    }
}
