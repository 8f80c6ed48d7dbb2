//! End-to-end alert lifecycle through the monitoring service
//!
//! Samples are pushed through the collector and evaluator exactly as the
//! timers would, then the read API is checked.

use pretty_assertions::assert_eq;
use vigil::{
    alerts::{AlertStatus, StatusFilter},
    monitors::{HealthStatus, Metric, Severity},
};

use crate::helpers::*;

#[tokio::test]
async fn test_critical_cpu_resolves_when_back_to_normal() {
    let source = ScriptedSource::new(Readings {
        cpu: Some(95.0),
        ..Default::default()
    });
    let sink = RecordingSink::new();
    let service = open_service(&manual_config(in_memory_storage()), source.clone(), sink.clone()).await;

    tick(&service).await;

    let active = service.get_alerts(StatusFilter::Active).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].metric, Metric::Cpu);
    assert_eq!(active[0].severity, Severity::Critical);
    assert_eq!(active[0].threshold, 90.0);

    source.set_cpu(50.0);
    tick(&service).await;

    assert!(service.get_alerts(StatusFilter::Active).await.is_empty());

    let resolved = service.get_alerts(StatusFilter::Resolved).await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, active[0].id);
    assert_eq!(resolved[0].status, AlertStatus::Resolved);
    assert!(resolved[0].resolved_at.unwrap() >= resolved[0].created_at);

    // no new alert, and recovery is not delivered
    assert_eq!(service.get_alerts(StatusFilter::All).await.len(), 1);
    assert_eq!(sink.delivered().len(), 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_sustained_warning_notifies_once() {
    let source = ScriptedSource::new(Readings {
        memory: Some(85.0),
        ..Default::default()
    });
    let sink = RecordingSink::new();
    let service = open_service(&manual_config(in_memory_storage()), source, sink.clone()).await;

    tick(&service).await;
    tick(&service).await;
    tick(&service).await;

    let active = service.get_alerts(StatusFilter::Active).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].metric, Metric::Memory);
    assert_eq!(active[0].severity, Severity::Warning);

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].id, active[0].id);

    service.shutdown().await;
}

#[tokio::test]
async fn test_escalation_keeps_both_severities_until_recovery() {
    let source = ScriptedSource::new(Readings {
        disk: Some(85.0),
        ..Default::default()
    });
    let sink = RecordingSink::new();
    let service = open_service(&manual_config(in_memory_storage()), source.clone(), sink.clone()).await;

    tick(&service).await;
    source.set(Readings {
        disk: Some(97.0),
        ..Default::default()
    });
    tick(&service).await;

    let mut severities: Vec<_> = service
        .get_alerts(StatusFilter::Active)
        .await
        .into_iter()
        .map(|alert| alert.severity)
        .collect();
    severities.sort();
    assert_eq!(severities, vec![Severity::Warning, Severity::Critical]);
    assert_eq!(sink.delivered().len(), 2);

    let health = service.get_health_status().await;
    assert_eq!(health.status, HealthStatus::Critical);
    assert_eq!(health.alerts.len(), 1);
    assert_eq!(health.alerts[0].severity, Severity::Critical);

    source.set(Readings {
        disk: Some(10.0),
        ..Default::default()
    });
    tick(&service).await;

    assert!(service.get_alerts(StatusFilter::Active).await.is_empty());
    assert_eq!(service.get_alerts(StatusFilter::Resolved).await.len(), 2);

    service.shutdown().await;
}

#[tokio::test]
async fn test_health_progression() {
    let source = ScriptedSource::new(Readings {
        cpu: Some(20.0),
        memory: Some(30.0),
        ..Default::default()
    });
    let service =
        open_service(&manual_config(in_memory_storage()), source.clone(), RecordingSink::new()).await;

    let health = service.get_health_status().await;
    assert_eq!(health.status, HealthStatus::Unknown);
    assert_eq!(health.message, "No metrics available");

    tick(&service).await;
    let health = service.get_health_status().await;
    assert_eq!(health.status, HealthStatus::Healthy);
    assert!(health.metrics.is_some());

    source.set_memory(82.0);
    tick(&service).await;
    let health = service.get_health_status().await;
    assert_eq!(health.status, HealthStatus::Warning);
    assert_eq!(health.message, "System has warnings");
    assert_eq!(health.alerts[0].metric, Metric::Memory);

    service.shutdown().await;
}

#[tokio::test]
async fn test_muted_alerts_are_recorded_but_not_delivered() {
    let source = ScriptedSource::new(Readings {
        cpu: Some(99.0),
        ..Default::default()
    });
    let sink = RecordingSink::new();
    let service = open_service(&manual_config(in_memory_storage()), source.clone(), sink.clone()).await;

    service.mute_alerts(chrono::Duration::hours(1)).await;
    tick(&service).await;

    assert_eq!(service.get_alerts(StatusFilter::Active).await.len(), 1);
    assert!(sink.delivered().is_empty());

    // the alert is already active; unmuting does not replay it
    service.unmute_alerts().await;
    tick(&service).await;
    assert!(sink.delivered().is_empty());

    service.shutdown().await;
}

#[tokio::test]
async fn test_evaluation_without_samples_is_a_no_op() {
    let service = open_service(
        &manual_config(in_memory_storage()),
        ScriptedSource::new(Readings::default()),
        RecordingSink::new(),
    )
    .await;

    let transitions = service.evaluate_now().await.unwrap();
    assert!(transitions.is_empty());
    assert!(service.get_alerts(StatusFilter::All).await.is_empty());

    service.shutdown().await;
}
