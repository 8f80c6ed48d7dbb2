//! Helper functions for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use vigil::{
    CpuMetrics, DiskMetrics, MemoryMetrics, MetricSample, SystemMetrics,
    alerts::{Alert, AlertSink},
    config::{Config, ScheduleConfig, StorageConfig},
    service::MonitoringService,
    sources::MetricsSource,
};

const GB: u64 = 1024 * 1024 * 1024;

/// Values the next sample will carry; `None` leaves the group empty
#[derive(Debug, Clone, Default)]
pub struct Readings {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<f64>,
}

pub fn sample_from(readings: &Readings) -> MetricSample {
    MetricSample::new(
        Utc::now(),
        SystemMetrics {
            cpu: readings.cpu.map(|usage| CpuMetrics::new(usage, None)),
            memory: readings
                .memory
                .and_then(|usage| MemoryMetrics::from_bytes(100 * GB, (usage * GB as f64) as u64)),
            disk: readings
                .disk
                .and_then(|usage| DiskMetrics::from_bytes(100 * GB, (usage * GB as f64) as u64)),
            network: None,
        },
        None,
    )
}

/// Source returning whatever readings the test set last
#[derive(Default)]
pub struct ScriptedSource {
    readings: Mutex<Readings>,
    fail: Mutex<Option<String>>,
}

impl ScriptedSource {
    pub fn new(readings: Readings) -> Arc<Self> {
        Arc::new(Self {
            readings: Mutex::new(readings),
            fail: Mutex::new(None),
        })
    }

    pub fn set(&self, readings: Readings) {
        *self.readings.lock().unwrap() = readings;
    }

    pub fn set_cpu(&self, cpu: f64) {
        self.readings.lock().unwrap().cpu = Some(cpu);
    }

    pub fn set_memory(&self, memory: f64) {
        self.readings.lock().unwrap().memory = Some(memory);
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.fail.lock().unwrap() = None;
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn sample(&self) -> anyhow::Result<MetricSample> {
        if let Some(message) = self.fail.lock().unwrap().clone() {
            anyhow::bail!(message);
        }
        Ok(sample_from(&self.readings.lock().unwrap()))
    }
}

/// Sink remembering every delivered alert
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Alert>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delivered(&self) -> Vec<Alert> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
        self.delivered.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Config whose timers never fire during a test; ticks are driven manually
pub fn manual_config(storage: StorageConfig) -> Config {
    Config {
        schedule: ScheduleConfig {
            collection_interval_secs: 3600,
            evaluation_interval_secs: 3600,
        },
        storage,
        ..Default::default()
    }
}

pub fn in_memory_storage() -> StorageConfig {
    StorageConfig::None {
        retention_hours: 24,
        max_alerts: 1000,
    }
}

pub fn json_storage(data_dir: &Path) -> StorageConfig {
    StorageConfig::Json {
        data_dir: data_dir.to_path_buf(),
        retention_hours: 24,
        max_alerts: 1000,
    }
}

pub async fn open_service(
    config: &Config,
    source: Arc<ScriptedSource>,
    sink: Arc<RecordingSink>,
) -> MonitoringService {
    MonitoringService::open(config, source, sink).await.unwrap()
}

/// Collect one sample and evaluate it
pub async fn tick(service: &MonitoringService) {
    service.collect_now().await.unwrap();
    service.evaluate_now().await.unwrap();
}
