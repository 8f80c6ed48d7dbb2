use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::trace;

use crate::monitors::thresholds::Thresholds;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None {
        #[serde(default = "default_retention_hours")]
        retention_hours: u32,

        #[serde(default = "default_max_alerts")]
        max_alerts: usize,
    },

    /// JSON documents rewritten after every mutation (default)
    Json {
        /// Directory holding `metrics.json` and `alerts.json`
        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,

        /// Samples older than this are pruned on every append
        #[serde(default = "default_retention_hours")]
        retention_hours: u32,

        /// Alerts kept regardless of status, oldest dropped first
        #[serde(default = "default_max_alerts")]
        max_alerts: usize,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Json {
            data_dir: default_data_dir(),
            retention_hours: default_retention_hours(),
            max_alerts: default_max_alerts(),
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> chrono::Duration {
        let hours = match self {
            StorageConfig::None { retention_hours, .. }
            | StorageConfig::Json {
                retention_hours, ..
            } => *retention_hours,
        };
        chrono::Duration::hours(hours as i64)
    }

    pub fn max_alerts(&self) -> usize {
        match self {
            StorageConfig::None { max_alerts, .. } | StorageConfig::Json { max_alerts, .. } => {
                *max_alerts
            }
        }
    }

    pub fn data_dir(&self) -> Option<&PathBuf> {
        match self {
            StorageConfig::None { .. } => None,
            StorageConfig::Json { data_dir, .. } => Some(data_dir),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_retention_hours() -> u32 {
    24
}

fn default_max_alerts() -> usize {
    1000
}

/// Longest accepted collection or evaluation interval (one day)
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    #[serde(default = "default_evaluation_interval")]
    pub evaluation_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            collection_interval_secs: default_collection_interval(),
            evaluation_interval_secs: default_evaluation_interval(),
        }
    }
}

fn default_collection_interval() -> u64 {
    30
}

fn default_evaluation_interval() -> u64 {
    60
}

/// Where application-level metrics are read from
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApplicationConfig {
    /// Newline-delimited JSON log of the served application
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Only log entries younger than this are counted
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            window_minutes: default_window_minutes(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("./logs/combined.log")
}

fn default_window_minutes() -> u32 {
    60
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "crate::util::get_default_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: crate::util::get_default_bind_addr(),
            enable_cors: default_enable_cors(),
        }
    }
}

fn default_enable_cors() -> bool {
    true
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertTarget {
    Discord(Discord),
    Webhook(Webhook),
    Desktop(Desktop),
    Log,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Desktop {
    #[serde(default = "default_notification_title")]
    pub title: String,
}

fn default_notification_title() -> String {
    String::from("Vigil Alert")
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub application: ApplicationConfig,

    /// Notification targets; alerts are only logged when empty
    #[serde(default)]
    pub alerts: Vec<AlertTarget>,

    #[serde(default)]
    pub api: ApiSettings,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.thresholds.validate()?;

        if self.schedule.collection_interval_secs == 0 {
            anyhow::bail!("collection interval must be at least one second");
        }
        if self.schedule.evaluation_interval_secs == 0 {
            anyhow::bail!("evaluation interval must be at least one second");
        }
        if self.schedule.collection_interval_secs > MAX_INTERVAL_SECS
            || self.schedule.evaluation_interval_secs > MAX_INTERVAL_SECS
        {
            anyhow::bail!("intervals must not exceed {MAX_INTERVAL_SECS} seconds");
        }
        if self.storage.max_alerts() == 0 {
            anyhow::bail!("max_alerts must be at least 1");
        }
        if self.storage.retention() <= chrono::Duration::zero() {
            anyhow::bail!("retention must be at least one hour");
        }

        Ok(())
    }
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let config: Config = serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}
