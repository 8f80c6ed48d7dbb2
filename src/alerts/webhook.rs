use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{info, instrument};

use super::{Alert, AlertSink};

/// Posts alerts as JSON to a generic webhook
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    #[instrument(skip_all, fields(alert_id = %alert.id))]
    async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
        let payload = json!({
            "message": alert.message,
            "id": alert.id,
            "metric": alert.metric,
            "severity": alert.severity,
            "value": alert.value,
            "threshold": alert.threshold,
            "created_at": alert.created_at.to_rfc3339(),
            "timestamp": Utc::now().to_rfc3339()
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("webhook alert failed with status: {}", response.status());
        }

        info!("successfully sent webhook alert");
        Ok(())
    }
}
