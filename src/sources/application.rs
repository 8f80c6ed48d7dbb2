//! Application metrics from a newline-delimited JSON request log
//!
//! Every entry with a readable `timestamp` inside the window counts as one
//! request. Entries with `"level": "error"` count as errors and a numeric
//! `duration_ms` contributes to the average latency. Lines that are not JSON
//! objects are ignored.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::ApplicationMetrics;

use super::ApplicationProbe;

#[derive(Debug, Deserialize)]
struct LogEntry {
    timestamp: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    duration_ms: Option<f64>,
}

/// Tallies of the entries inside one window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogCounts {
    pub requests: u64,
    pub errors: u64,
    latency_total: f64,
    latency_samples: u64,
}

impl LogCounts {
    pub fn avg_latency_ms(&self) -> Option<f64> {
        (self.latency_samples > 0).then(|| self.latency_total / self.latency_samples as f64)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Count the entries of `content` younger than `window` at `now`
pub fn count_entries(content: &str, now: DateTime<Utc>, window: Duration) -> LogCounts {
    let cutoff = now - window;
    let mut counts = LogCounts::default();

    for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Ok(entry) = serde_json::from_str::<LogEntry>(line) else {
            continue;
        };
        let Some(timestamp) = entry.timestamp.as_deref().and_then(parse_timestamp) else {
            continue;
        };
        if timestamp <= cutoff {
            continue;
        }

        counts.requests += 1;
        if entry.level.as_deref() == Some("error") {
            counts.errors += 1;
        }
        if let Some(duration) = entry.duration_ms
            && duration.is_finite()
        {
            counts.latency_total += duration;
            counts.latency_samples += 1;
        }
    }

    counts
}

/// [`ApplicationProbe`] reading the application's log file
pub struct LogFileProbe {
    path: PathBuf,
    window: Duration,
    started: Instant,
}

impl LogFileProbe {
    pub fn new(path: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            path: path.into(),
            window,
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl ApplicationProbe for LogFileProbe {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn application(&self) -> anyhow::Result<ApplicationMetrics> {
        let uptime = self.started.elapsed().as_secs_f64();

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("log file does not exist yet");
                return Ok(ApplicationMetrics::new(0, 0, uptime));
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        // lines with invalid UTF-8 are decoded lossily and simply fail to parse
        let content = String::from_utf8_lossy(&bytes);
        let counts = count_entries(&content, Utc::now(), self.window);
        debug!(
            "{} requests, {} errors in the last {} minutes",
            counts.requests,
            counts.errors,
            self.window.num_minutes()
        );

        Ok(ApplicationMetrics::new(counts.errors, counts.requests, uptime)
            .with_latency(counts.avg_latency_ms()))
    }
}
