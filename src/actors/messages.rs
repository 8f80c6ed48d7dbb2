//! Message types for actor communication
//!
//! 1. **Commands**: sent to one actor via mpsc, optionally answered over oneshot
//! 2. **Events**: broadcast to every subscriber; slow subscribers may lag

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::MetricSample;
use crate::monitors::AlertTransition;

/// Published after a sample has been appended to the metric store
#[derive(Debug, Clone)]
pub struct SampleEvent {
    pub sample: MetricSample,

    /// When the sample was stored
    pub stored_at: DateTime<Utc>,
}

/// Commands accepted by the collector actor
#[derive(Debug)]
pub enum CollectorCommand {
    /// Collect a sample immediately, bypassing the interval timer
    CollectNow {
        respond_to: oneshot::Sender<anyhow::Result<MetricSample>>,
    },

    /// Change the collection interval; restarts the timer
    UpdateInterval { interval_secs: u64 },

    /// Finish the current tick and exit
    Shutdown,
}

/// Commands accepted by the evaluator actor
#[derive(Debug)]
pub enum EvaluatorCommand {
    /// Evaluate the latest sample immediately
    ///
    /// Answers with the transitions of the pass; an empty list when there was
    /// no sample yet.
    EvaluateNow {
        respond_to: oneshot::Sender<anyhow::Result<Vec<AlertTransition>>>,
    },

    UpdateInterval { interval_secs: u64 },

    Shutdown,
}
