use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::alerts::{Alert, AlertSink};
use crate::config::Discord;
use crate::monitors::thresholds::Severity;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

/// Delivers alerts to a Discord webhook as an embed
#[derive(Debug, Clone)]
pub struct DiscordSink {
    client: Client,
    discord: Discord,
}

impl DiscordSink {
    pub fn new(discord: Discord) -> Self {
        Self {
            client: Client::new(),
            discord,
        }
    }

    pub fn build_alert_embed(&self, alert: &Alert) -> Embed {
        let (title, color) = match alert.severity {
            Severity::Critical => ("🔴 Critical Alert", 15158332), // Red
            Severity::Warning => ("⚠️ Warning Alert", 15105570),   // Orange
        };

        let progress_bar = create_progress_bar(alert.value, alert.threshold);

        Embed {
            title: Some(title.to_string()),
            description: Some(alert.message.clone()),
            color: Some(color),
            fields: vec![
                EmbedField {
                    name: "📈 Current Value".to_string(),
                    value: alert.metric.format_value(alert.value),
                    inline: true,
                },
                EmbedField {
                    name: "⚠️ Threshold".to_string(),
                    value: alert.metric.format_value(alert.threshold),
                    inline: true,
                },
                EmbedField {
                    name: "📊 Status".to_string(),
                    value: progress_bar,
                    inline: false,
                },
            ],
            footer: Some(EmbedFooter {
                text: format!("Metric: {} | Alert: {}", alert.metric, alert.id),
            }),
            timestamp: Some(alert.created_at.to_rfc3339()),
        }
    }

    pub fn build_message(&self, alert: &Alert) -> Message {
        let mut message_builder = MessageBuilder::new().add_embed(self.build_alert_embed(alert));
        if let Some(user_id) = &self.discord.user_id {
            message_builder = message_builder.content(format!(
                "🚨 ({} ~ {}) <@{user_id}>",
                alert.metric,
                alert.metric.format_value(alert.value)
            ));
        }
        message_builder.build()
    }
}

fn create_progress_bar(current: f64, limit: f64) -> String {
    if limit <= 0.0 {
        return "🔴 `██████████` limit reached".to_string();
    }

    let percentage = (current / limit) * 100.0;
    let filled = ((current / limit) * 10.0).max(0.0) as usize;
    let empty = 10 - filled.min(10);

    let bar = "█".repeat(filled.min(10)) + &"░".repeat(empty);
    let status_emoji = if percentage >= 100.0 {
        "🔴"
    } else if percentage >= 80.0 {
        "🟠"
    } else if percentage >= 60.0 {
        "🟡"
    } else {
        "🟢"
    };

    format!("{} `{}` {:.1}% of limit", status_emoji, bar, percentage)
}

#[async_trait]
impl AlertSink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    #[instrument(skip_all, fields(alert_id = %alert.id))]
    async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
        let message = self.build_message(alert);

        let response = self
            .client
            .post(&self.discord.url)
            .json(&message)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            if let Ok(error_text) = response.text().await {
                error!("Discord API error response: {}", error_text);
            }
            anyhow::bail!("Discord message failed with status: {status}");
        }

        info!("Successfully sent Discord message");
        Ok(())
    }
}
