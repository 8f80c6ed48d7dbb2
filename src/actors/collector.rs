//! CollectorActor - samples the metrics source on a fixed interval
//!
//! ```text
//! Timer tick → MetricsSource::sample → MetricStore::append → SampleEvent
//!     ↑
//!     └─── Commands (CollectNow, UpdateInterval, Shutdown)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, instrument, trace, warn};

use crate::MetricSample;
use crate::sources::MetricsSource;
use crate::storage::MetricStore;

use super::messages::{CollectorCommand, SampleEvent};
use super::{run_guarded, ticker};
use crate::config::MAX_INTERVAL_SECS;

pub struct CollectorActor {
    source: Arc<dyn MetricsSource>,
    store: Arc<MetricStore>,
    command_rx: mpsc::Receiver<CollectorCommand>,
    sample_tx: broadcast::Sender<SampleEvent>,
    interval_duration: Duration,
}

impl CollectorActor {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        store: Arc<MetricStore>,
        interval_duration: Duration,
        command_rx: mpsc::Receiver<CollectorCommand>,
        sample_tx: broadcast::Sender<SampleEvent>,
    ) -> Self {
        Self {
            source,
            store,
            command_rx,
            sample_tx,
            interval_duration,
        }
    }

    /// Run until a Shutdown command arrives or every handle is dropped
    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting collector actor");

        let mut ticker = ticker(self.interval_duration);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = run_guarded(self.collect()).await {
                        error!("failed to collect metrics: {e:#}");
                    }
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("every handle dropped, shutting down");
                        break;
                    };

                    match cmd {
                        CollectorCommand::CollectNow { respond_to } => {
                            debug!("received CollectNow command");
                            let result = run_guarded(self.collect()).await;
                            let _ = respond_to.send(result);
                        }

                        CollectorCommand::UpdateInterval { interval_secs } => {
                            if interval_secs == 0 || interval_secs > MAX_INTERVAL_SECS {
                                warn!("ignoring collection interval of {interval_secs}s");
                                continue;
                            }
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs);
                            ticker = super::ticker(self.interval_duration);
                        }

                        CollectorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("collector actor stopped");
    }

    /// Take one sample, store it and publish it
    #[instrument(skip(self))]
    async fn collect(&self) -> Result<MetricSample> {
        let sample = self
            .source
            .sample()
            .await
            .context("metrics source failed")?;

        self.store.append(sample.clone()).await;

        let event = SampleEvent {
            sample: sample.clone(),
            stored_at: Utc::now(),
        };

        // no subscribers is fine
        match self.sample_tx.send(event) {
            Ok(receivers) => trace!("published sample to {receivers} receivers"),
            Err(_) => trace!("no receivers for sample event"),
        }

        Ok(sample)
    }
}

/// Cloneable handle for a running [`CollectorActor`]
#[derive(Clone)]
pub struct CollectorHandle {
    sender: mpsc::Sender<CollectorCommand>,
}

impl CollectorHandle {
    /// Spawn the actor on the current runtime
    pub fn spawn(
        source: Arc<dyn MetricsSource>,
        store: Arc<MetricStore>,
        interval: Duration,
        sample_tx: broadcast::Sender<SampleEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = CollectorActor::new(source, store, interval, cmd_rx, sample_tx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Collect immediately and return the stored sample
    pub async fn collect_now(&self) -> Result<MetricSample> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CollectorCommand::CollectNow { respond_to: tx })
            .await
            .context("failed to send CollectNow command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(CollectorCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Stop the actor and wait for it to exit
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(CollectorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        self.sender.closed().await;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
