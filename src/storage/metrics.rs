//! Time-bounded log of metric samples
//!
//! Samples are kept in insertion order, which is also time order. Every
//! append prunes samples that fell out of the retention window, so after
//! `append` returns no retained sample is older than the window.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, instrument, trace};

use crate::MetricSample;

use super::document::JsonDocument;

/// Query window accepted by the read API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    OneDay,
}

impl TimeRange {
    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::OneHour => Duration::hours(1),
            TimeRange::SixHours => Duration::hours(6),
            TimeRange::OneDay => Duration::hours(24),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneHour => "1h",
            TimeRange::SixHours => "6h",
            TimeRange::OneDay => "24h",
        }
    }

    /// Parse a range, falling back to one hour for anything unrecognised
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TimeRange::OneHour),
            "6h" => Ok(TimeRange::SixHours),
            "24h" => Ok(TimeRange::OneDay),
            other => anyhow::bail!("unknown time range '{other}'"),
        }
    }
}

pub struct MetricStore {
    samples: RwLock<VecDeque<MetricSample>>,
    retention: Duration,

    /// Writer lock; also serializes snapshot writes in mutation order
    document: Mutex<Option<JsonDocument>>,
}

impl MetricStore {
    /// Store without persistence
    pub fn in_memory(retention: Duration) -> Self {
        Self {
            samples: RwLock::new(VecDeque::new()),
            retention,
            document: Mutex::new(None),
        }
    }

    /// Store backed by `document`, loaded from its last snapshot
    ///
    /// A missing or corrupt document yields an empty store. Samples outside the
    /// retention window are dropped on load.
    pub async fn open(document: JsonDocument, retention: Duration) -> Self {
        let samples: Vec<MetricSample> = document.load_or_default().await;
        let cutoff = Utc::now() - retention;
        let samples: VecDeque<_> = samples
            .into_iter()
            .filter(|sample| sample.timestamp > cutoff)
            .collect();

        debug!(
            "loaded {} samples from {}",
            samples.len(),
            document.path().display()
        );

        Self {
            samples: RwLock::new(samples),
            retention,
            document: Mutex::new(Some(document)),
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Append a sample and prune everything outside the retention window
    ///
    /// Persistence failures are logged; the in-memory append is kept.
    #[instrument(skip_all, fields(timestamp = %sample.timestamp))]
    pub async fn append(&self, sample: MetricSample) {
        let document = self.document.lock().await;

        let snapshot = {
            let mut samples = self.samples.write().await;
            samples.push_back(sample);

            let cutoff = Utc::now() - self.retention;
            let before = samples.len();
            samples.retain(|sample| sample.timestamp > cutoff);

            let pruned = before - samples.len();
            if pruned > 0 {
                trace!("pruned {pruned} samples older than {cutoff}");
            }

            document
                .as_ref()
                .map(|_| samples.iter().cloned().collect::<Vec<_>>())
        };

        if let (Some(document), Some(snapshot)) = (document.as_ref(), snapshot)
            && let Err(e) = document.save(&snapshot).await
        {
            error!(
                "failed to persist metrics to {}: {e}",
                document.path().display()
            );
        }
    }

    /// Samples younger than `range`, oldest first
    pub async fn query(&self, range: Duration) -> Vec<MetricSample> {
        let cutoff = Utc::now() - range;
        self.samples
            .read()
            .await
            .iter()
            .filter(|sample| sample.timestamp > cutoff)
            .cloned()
            .collect()
    }

    pub async fn query_range(&self, range: TimeRange) -> Vec<MetricSample> {
        self.query(range.duration()).await
    }

    /// Most recent sample, `None` if nothing has been collected yet
    pub async fn latest(&self) -> Option<MetricSample> {
        self.samples.read().await.back().cloned()
    }

    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.samples.read().await.is_empty()
    }
}
