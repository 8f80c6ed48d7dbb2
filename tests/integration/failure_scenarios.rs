//! Failure scenarios
//!
//! - A failing probe leaves its group empty without failing the tick
//! - A failing source fails one tick, the next one succeeds
//! - Failed deliveries and failed writes never undo recorded state

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::tempdir;
use vigil::{
    CpuMetrics, DiskMetrics, MemoryMetrics, NetworkMetrics,
    alerts::{StatusFilter, WebhookSink},
    config::StorageConfig,
    monitors::{HealthStatus, Metric},
    service::MonitoringService,
    sources::{ProbeSource, SystemProbe},
    storage::TimeRange,
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

/// Host probe whose network interface cannot be read
struct NoNetwork;

#[async_trait]
impl SystemProbe for NoNetwork {
    async fn cpu(&self) -> anyhow::Result<CpuMetrics> {
        Ok(CpuMetrics::new(35.0, Some(0.7)))
    }

    async fn memory(&self) -> anyhow::Result<MemoryMetrics> {
        MemoryMetrics::from_bytes(8 * 1024 * 1024 * 1024, 2 * 1024 * 1024 * 1024)
            .ok_or_else(|| anyhow::anyhow!("no memory"))
    }

    async fn disk(&self) -> anyhow::Result<DiskMetrics> {
        DiskMetrics::from_bytes(1000, 100).ok_or_else(|| anyhow::anyhow!("no disk"))
    }

    async fn network(&self) -> anyhow::Result<NetworkMetrics> {
        anyhow::bail!("failed to read /proc/net/dev")
    }
}

#[tokio::test]
async fn test_failing_network_probe_yields_partial_sample() {
    let source = Arc::new(ProbeSource::new(NoNetwork));
    let service = MonitoringService::open(
        &manual_config(in_memory_storage()),
        source,
        RecordingSink::new(),
    )
    .await
    .unwrap();

    let sample = service.collect_now().await.unwrap();

    assert_eq!(sample.get("cpu.usage_percent"), Some(35.0));
    assert_eq!(sample.get("memory.usage_percent"), Some(25.0));
    assert!(sample.system.network.is_none());
    assert!(service.evaluate_now().await.unwrap().is_empty());
    assert_eq!(service.get_health_status().await.status, HealthStatus::Healthy);

    service.shutdown().await;
}

#[tokio::test]
async fn test_source_failure_does_not_stop_collection() {
    let source = ScriptedSource::new(Readings {
        cpu: Some(40.0),
        ..Default::default()
    });
    let service =
        open_service(&manual_config(in_memory_storage()), source.clone(), RecordingSink::new()).await;

    source.fail_with("sensor offline");
    let error = service.collect_now().await.unwrap_err();
    assert!(format!("{error:#}").contains("sensor offline"));
    assert!(service.get_metrics(TimeRange::OneHour).await.is_empty());

    source.recover();
    service.collect_now().await.unwrap();
    assert_eq!(service.get_metrics(TimeRange::OneHour).await.len(), 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_missing_group_neither_triggers_nor_resolves() {
    let source = ScriptedSource::new(Readings {
        cpu: Some(96.0),
        ..Default::default()
    });
    let service =
        open_service(&manual_config(in_memory_storage()), source.clone(), RecordingSink::new()).await;
    tick(&service).await;

    // cpu probe fails on the next sample
    source.set(Readings {
        memory: Some(20.0),
        ..Default::default()
    });
    tick(&service).await;

    let active = service.get_alerts(StatusFilter::Active).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].metric, Metric::Cpu);

    service.shutdown().await;
}

#[tokio::test]
async fn test_failing_webhook_does_not_block_alerting() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = ScriptedSource::new(Readings {
        disk: Some(99.0),
        ..Default::default()
    });
    let service = MonitoringService::open(
        &manual_config(in_memory_storage()),
        source,
        Arc::new(WebhookSink::new(format!("{}/alerts", mock_server.uri()))),
    )
    .await
    .unwrap();

    tick(&service).await;

    let active = service.get_alerts(StatusFilter::Active).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].metric, Metric::Disk);

    service.shutdown().await;
}

#[tokio::test]
async fn test_unwritable_data_dir_keeps_in_memory_state() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("data");
    std::fs::write(&blocker, "a file where the data directory should be").unwrap();

    let config = manual_config(StorageConfig::Json {
        data_dir: blocker,
        retention_hours: 24,
        max_alerts: 100,
    });
    let source = ScriptedSource::new(Readings {
        memory: Some(97.0),
        ..Default::default()
    });
    let service = open_service(&config, source, RecordingSink::new()).await;

    tick(&service).await;

    assert_eq!(service.get_metrics(TimeRange::OneHour).await.len(), 1);
    assert_eq!(service.get_alerts(StatusFilter::Active).await.len(), 1);

    service.shutdown().await;
}
