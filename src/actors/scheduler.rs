use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::ScheduleConfig;
use crate::monitors::AlertStateMachine;
use crate::sources::MetricsSource;
use crate::storage::MetricStore;

use super::{CollectorHandle, EvaluatorHandle, SampleEvent};

const SAMPLE_CHANNEL_CAPACITY: usize = 64;

/// Owns the collector and evaluator actors
pub struct Scheduler {
    collector: CollectorHandle,
    evaluator: EvaluatorHandle,
    sample_tx: broadcast::Sender<SampleEvent>,
}

impl Scheduler {
    pub fn start(
        schedule: &ScheduleConfig,
        source: Arc<dyn MetricsSource>,
        store: Arc<MetricStore>,
        machine: Arc<AlertStateMachine>,
    ) -> Self {
        let (sample_tx, _) = broadcast::channel(SAMPLE_CHANNEL_CAPACITY);

        let collector = CollectorHandle::spawn(
            source,
            store.clone(),
            Duration::from_secs(schedule.collection_interval_secs),
            sample_tx.clone(),
        );
        let evaluator = EvaluatorHandle::spawn(
            store,
            machine,
            Duration::from_secs(schedule.evaluation_interval_secs),
        );

        debug!(
            "scheduler started: collecting every {}s, evaluating every {}s",
            schedule.collection_interval_secs, schedule.evaluation_interval_secs
        );

        Self {
            collector,
            evaluator,
            sample_tx,
        }
    }

    pub fn collector(&self) -> &CollectorHandle {
        &self.collector
    }

    pub fn evaluator(&self) -> &EvaluatorHandle {
        &self.evaluator
    }

    /// Receive every sample stored from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SampleEvent> {
        self.sample_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.collector.is_running() && self.evaluator.is_running()
    }

    /// Stop both actors and wait for them to exit
    pub async fn shutdown(&self) {
        let (collector, evaluator) =
            tokio::join!(self.collector.shutdown(), self.evaluator.shutdown());

        if let Err(e) = collector {
            warn!("collector did not shut down cleanly: {e:#}");
        }
        if let Err(e) = evaluator {
            warn!("evaluator did not shut down cleanly: {e:#}");
        }

        debug!("scheduler stopped");
    }
}
