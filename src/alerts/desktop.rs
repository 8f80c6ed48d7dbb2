use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, instrument};

use super::{Alert, AlertSink};

/// Shows alerts as desktop notifications
///
/// Uses `osascript` on macOS and `notify-send` everywhere else.
#[derive(Debug, Clone)]
pub struct DesktopSink {
    title: String,
}

impl DesktopSink {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    fn command(&self, alert: &Alert) -> Command {
        let body = format!("[{}] {}", alert.severity, alert.message);

        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                escape_applescript(&body),
                escape_applescript(&self.title)
            );
            let mut command = Command::new("osascript");
            command.arg("-e").arg(script);
            command
        } else {
            let mut command = Command::new("notify-send");
            command.arg(&self.title).arg(body);
            command
        }
    }
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl AlertSink for DesktopSink {
    fn name(&self) -> &str {
        "desktop"
    }

    #[instrument(skip_all, fields(alert_id = %alert.id))]
    async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
        let output = self
            .command(alert)
            .output()
            .await
            .context("failed to run notification command")?;

        if !output.status.success() {
            anyhow::bail!(
                "notification command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        info!("desktop notification sent");
        Ok(())
    }
}
