//! Persistent stores for samples and alerts
//!
//! Both stores keep their collection in memory behind a `RwLock` and, when
//! backed by a [`JsonDocument`], rewrite the whole document after every
//! mutation.
//!
//! ## Locking
//!
//! A mutation takes the store's writer lock first, changes the collection
//! under the write lock, releases it and then writes the snapshot while still
//! holding the writer lock. Readers never wait for disk I/O, and snapshots
//! reach the disk in mutation order.
//!
//! ## Layout
//!
//! ```text
//! <data_dir>/metrics.json   samples inside the retention window
//! <data_dir>/alerts.json    the last `max_alerts` alerts
//! ```

pub mod alerts;
pub mod document;
pub mod error;
pub mod metrics;

use std::path::Path;

pub use alerts::AlertStore;
pub use document::JsonDocument;
pub use error::{StorageError, StorageResult};
pub use metrics::{MetricStore, TimeRange};

use crate::config::StorageConfig;

pub const METRICS_FILE: &str = "metrics.json";
pub const ALERTS_FILE: &str = "alerts.json";

/// Open both stores for the configured backend
pub async fn open_stores(config: &StorageConfig) -> (MetricStore, AlertStore) {
    match config.data_dir() {
        Some(data_dir) => open_in(data_dir, config).await,
        None => (
            MetricStore::in_memory(config.retention()),
            AlertStore::in_memory(config.max_alerts()),
        ),
    }
}

async fn open_in(data_dir: &Path, config: &StorageConfig) -> (MetricStore, AlertStore) {
    let metrics = MetricStore::open(
        JsonDocument::new(data_dir.join(METRICS_FILE)),
        config.retention(),
    )
    .await;
    let alerts = AlertStore::open(
        JsonDocument::new(data_dir.join(ALERTS_FILE)),
        config.max_alerts(),
    )
    .await;

    (metrics, alerts)
}
