//! Notification delivery through configured alert targets

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use vigil::{
    alerts::{StatusFilter, WebhookSink, build_sink},
    config::{AlertTarget, Discord, Webhook},
    monitors::{AlertStateMachine, Metric, Thresholds},
    storage::AlertStore,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn machine_with(targets: &[AlertTarget]) -> (AlertStateMachine, Arc<AlertStore>) {
    let store = Arc::new(AlertStore::in_memory(100));
    let machine = AlertStateMachine::new(Thresholds::default(), store.clone(), build_sink(targets));
    (machine, store)
}

#[tokio::test]
async fn test_webhook_and_discord_receive_triggered_alert() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(body_partial_json(json!({
            "metric": "memory",
            "severity": "critical",
            "value": 96.5,
            "threshold": 95.0
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/discord"))
        .and(body_partial_json(json!({ "content": "🚨 (memory ~ 96.50%) <@1234>" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (machine, _store) = machine_with(&[
        AlertTarget::Webhook(Webhook {
            url: format!("{}/webhook", mock_server.uri()),
        }),
        AlertTarget::Discord(Discord {
            url: format!("{}/discord", mock_server.uri()),
            user_id: Some("1234".to_string()),
        }),
    ]);

    machine.observe(Metric::Memory, 96.5).await;
    // sustained: no second delivery
    machine.observe(Metric::Memory, 97.0).await;
    // recovery is not delivered
    machine.observe(Metric::Memory, 10.0).await;
}

#[tokio::test]
async fn test_one_failing_target_does_not_stop_the_others() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/working"))
        .and(body_partial_json(json!({ "metric": "cpu", "severity": "warning" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (machine, store) = machine_with(&[
        AlertTarget::Webhook(Webhook {
            url: format!("{}/broken", mock_server.uri()),
        }),
        AlertTarget::Webhook(Webhook {
            url: format!("{}/working", mock_server.uri()),
        }),
    ]);

    let transitions = machine.observe(Metric::Cpu, 75.0).await;

    assert_eq!(transitions.len(), 1);
    assert_eq!(store.list(StatusFilter::Active).await.len(), 1);
}

#[tokio::test]
async fn test_muted_machine_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (machine, store) = machine_with(&[AlertTarget::Webhook(Webhook {
        url: mock_server.uri(),
    })]);

    machine.mute().await;
    machine.observe(Metric::Disk, 99.0).await;

    assert_eq!(store.list(StatusFilter::Active).await.len(), 1);
}

#[tokio::test]
async fn test_unresponsive_webhook_does_not_block_evaluation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3600)))
        .mount(&mock_server)
        .await;

    let store = Arc::new(AlertStore::in_memory(100));
    let machine = AlertStateMachine::new(
        Thresholds::default(),
        store.clone(),
        Arc::new(WebhookSink::new(mock_server.uri())),
    )
    .with_notify_timeout(Duration::from_millis(200));

    let transitions = tokio::time::timeout(Duration::from_secs(5), machine.observe(Metric::Cpu, 95.0))
        .await
        .expect("evaluation pass blocked on the webhook");
    assert_eq!(transitions.len(), 1);

    let transitions = tokio::time::timeout(Duration::from_secs(5), machine.observe(Metric::Cpu, 10.0))
        .await
        .expect("evaluation pass blocked on the webhook");
    assert_eq!(transitions.len(), 1);
    assert!(store.list(StatusFilter::Active).await.is_empty());
}
