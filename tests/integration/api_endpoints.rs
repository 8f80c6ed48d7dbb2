//! HTTP API against a live server on a random port

use std::net::SocketAddr;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::Value;
use vigil::{
    api::{AlertsResponse, ApiConfig, ApiState, MetricsResponse, spawn_api_server},
    service::MonitoringService,
    storage::TimeRange,
};

use crate::helpers::*;

async fn serve(service: Arc<MonitoringService>) -> String {
    let config = ApiConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        enable_cors: true,
    };
    let addr = spawn_api_server(config, ApiState::new(service))
        .await
        .unwrap();
    format!("http://{addr}/api/v1")
}

async fn started(readings: Readings) -> (Arc<MonitoringService>, Arc<ScriptedSource>, String) {
    let source = ScriptedSource::new(readings);
    let service = Arc::new(
        open_service(
            &manual_config(in_memory_storage()),
            source.clone(),
            RecordingSink::new(),
        )
        .await,
    );
    let base = serve(service.clone()).await;
    (service, source, base)
}

#[tokio::test]
async fn test_empty_service() {
    let (service, _source, base) = started(Readings::default()).await;

    let health: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "unknown");
    assert_eq!(health["message"], "No metrics available");

    let response = reqwest::get(format!("{base}/metrics/latest")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "no metrics collected yet");

    let metrics: MetricsResponse = reqwest::get(format!("{base}/metrics"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics.count, 0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_metrics_ranges() {
    let (service, _source, base) = started(Readings {
        cpu: Some(12.5),
        ..Default::default()
    })
    .await;
    tick(&service).await;
    tick(&service).await;

    for (query, expected) in [
        ("", TimeRange::OneHour),
        ("?range=6h", TimeRange::SixHours),
        ("?range=24h", TimeRange::OneDay),
        ("?range=forever", TimeRange::OneHour),
    ] {
        let response = reqwest::get(format!("{base}/metrics{query}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "query {query:?}");

        let metrics: MetricsResponse = response.json().await.unwrap();
        assert_eq!(metrics.range, expected, "query {query:?}");
        assert_eq!(metrics.count, 2);
        assert_eq!(metrics.metrics.len(), 2);
        assert!(metrics.metrics[0].timestamp <= metrics.metrics[1].timestamp);
    }

    let latest: Value = reqwest::get(format!("{base}/metrics/latest"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest["system"]["cpu"]["usage_percent"], 12.5);

    service.shutdown().await;
}

#[tokio::test]
async fn test_alerts_and_health_follow_evaluation() {
    let (service, source, base) = started(Readings {
        cpu: Some(92.0),
        ..Default::default()
    })
    .await;
    tick(&service).await;

    let health: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "critical");
    assert_eq!(health["alerts"][0]["metric"], "cpu");

    let active: AlertsResponse = reqwest::get(format!("{base}/alerts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active.count, 1);
    assert_eq!(active.alerts[0].threshold, 90.0);

    source.set_cpu(15.0);
    tick(&service).await;

    let resolved: AlertsResponse = reqwest::get(format!("{base}/alerts?status=resolved"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resolved.count, 1);
    assert_eq!(resolved.alerts[0].id, active.alerts[0].id);
    assert!(resolved.alerts[0].resolved_at.is_some());

    let health: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health.get("alerts").is_none());
    assert_eq!(health["metrics"]["system"]["cpu"]["usage_percent"], 15.0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_unknown_alert_status_is_rejected() {
    let (service, _source, base) = started(Readings::default()).await;

    let response = reqwest::get(format!("{base}/alerts?status=bogus"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("bogus"));

    service.shutdown().await;
}

#[tokio::test]
async fn test_stats() {
    let (service, _source, base) = started(Readings {
        memory: Some(85.0),
        ..Default::default()
    })
    .await;
    tick(&service).await;

    let stats: Value = reqwest::get(format!("{base}/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["samples"], 1);
    assert_eq!(stats["alerts_total"], 1);
    assert_eq!(stats["alerts_active"], 1);
    assert_eq!(stats["retention_hours"], 24);
    assert_eq!(stats["max_alerts"], 1000);
    assert_eq!(stats["alerts_muted"], false);

    service.shutdown().await;
}

#[tokio::test]
async fn test_cors_headers() {
    let (service, _source, base) = started(Readings::default()).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/health"))
        .header("Origin", "http://dashboard.local")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );

    service.shutdown().await;
}
