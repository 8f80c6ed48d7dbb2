//! Bounded alert history
//!
//! Alerts are kept in creation order. The store holds at most `capacity`
//! records; when full, the oldest record is dropped regardless of status.

use std::collections::VecDeque;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, instrument};

use crate::alerts::{Alert, StatusFilter};
use crate::monitors::thresholds::Metric;

use super::document::JsonDocument;

pub struct AlertStore {
    alerts: RwLock<VecDeque<Alert>>,
    capacity: usize,
    document: Mutex<Option<JsonDocument>>,
}

impl AlertStore {
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            alerts: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
            document: Mutex::new(None),
        }
    }

    /// Store backed by `document`; a missing or corrupt document starts empty
    pub async fn open(document: JsonDocument, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let alerts: Vec<Alert> = document.load_or_default().await;
        let skip = alerts.len().saturating_sub(capacity);
        let alerts: VecDeque<_> = alerts.into_iter().skip(skip).collect();

        debug!(
            "loaded {} alerts from {}",
            alerts.len(),
            document.path().display()
        );

        Self {
            alerts: RwLock::new(alerts),
            capacity,
            document: Mutex::new(Some(document)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a new alert or replace the record with the same id
    pub async fn upsert(&self, alert: Alert) {
        self.upsert_many(vec![alert]).await;
    }

    /// Apply several upserts with a single durable write
    #[instrument(skip_all, fields(count = alerts.len()))]
    pub async fn upsert_many(&self, alerts: Vec<Alert>) {
        if alerts.is_empty() {
            return;
        }

        let document = self.document.lock().await;

        let snapshot = {
            let mut stored = self.alerts.write().await;

            for alert in alerts {
                match stored.iter_mut().find(|existing| existing.id == alert.id) {
                    Some(existing) => *existing = alert,
                    None => stored.push_back(alert),
                }
            }

            while stored.len() > self.capacity {
                if let Some(evicted) = stored.pop_front() {
                    debug!("evicted alert {} ({})", evicted.id, evicted.status);
                }
            }

            document
                .as_ref()
                .map(|_| stored.iter().cloned().collect::<Vec<_>>())
        };

        if let (Some(document), Some(snapshot)) = (document.as_ref(), snapshot)
            && let Err(e) = document.save(&snapshot).await
        {
            error!(
                "failed to persist alerts to {}: {e}",
                document.path().display()
            );
        }
    }

    /// Alerts matching `filter`, most recent first
    pub async fn list(&self, filter: StatusFilter) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .iter()
            .rev()
            .filter(|alert| filter.matches(alert))
            .cloned()
            .collect()
    }

    /// Active alerts of one metric, in creation order
    pub async fn active_for(&self, metric: Metric) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .iter()
            .filter(|alert| alert.metric == metric && alert.is_active())
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }
}
