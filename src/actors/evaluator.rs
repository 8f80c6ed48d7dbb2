//! EvaluatorActor - feeds the latest sample to the alert state machine
//!
//! ```text
//! Timer tick → MetricStore::latest → AlertStateMachine::evaluate_sample
//! ```
//!
//! Without a stored sample the tick is a no-op.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, instrument, trace, warn};

use crate::monitors::{AlertStateMachine, AlertTransition};
use crate::storage::MetricStore;

use super::messages::EvaluatorCommand;
use super::{run_guarded, ticker};
use crate::config::MAX_INTERVAL_SECS;

pub struct EvaluatorActor {
    store: Arc<MetricStore>,
    machine: Arc<AlertStateMachine>,
    command_rx: mpsc::Receiver<EvaluatorCommand>,
    interval_duration: Duration,
}

impl EvaluatorActor {
    pub fn new(
        store: Arc<MetricStore>,
        machine: Arc<AlertStateMachine>,
        interval_duration: Duration,
        command_rx: mpsc::Receiver<EvaluatorCommand>,
    ) -> Self {
        Self {
            store,
            machine,
            command_rx,
            interval_duration,
        }
    }

    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting evaluator actor");

        let mut ticker = ticker(self.interval_duration);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = run_guarded(self.evaluate()).await {
                        error!("failed to evaluate alerts: {e:#}");
                    }
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("every handle dropped, shutting down");
                        break;
                    };

                    match cmd {
                        EvaluatorCommand::EvaluateNow { respond_to } => {
                            debug!("received EvaluateNow command");
                            let result = run_guarded(self.evaluate()).await;
                            let _ = respond_to.send(result);
                        }

                        EvaluatorCommand::UpdateInterval { interval_secs } => {
                            if interval_secs == 0 || interval_secs > MAX_INTERVAL_SECS {
                                warn!("ignoring evaluation interval of {interval_secs}s");
                                continue;
                            }
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs);
                            ticker = super::ticker(self.interval_duration);
                        }

                        EvaluatorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("evaluator actor stopped");
    }

    async fn evaluate(&self) -> Result<Vec<AlertTransition>> {
        let Some(sample) = self.store.latest().await else {
            trace!("no sample collected yet, skipping evaluation");
            return Ok(Vec::new());
        };

        let transitions = self.machine.evaluate_sample(&sample).await;
        if !transitions.is_empty() {
            debug!("evaluation produced {} transitions", transitions.len());
        }

        Ok(transitions)
    }
}

/// Cloneable handle for a running [`EvaluatorActor`]
#[derive(Clone)]
pub struct EvaluatorHandle {
    sender: mpsc::Sender<EvaluatorCommand>,
}

impl EvaluatorHandle {
    pub fn spawn(
        store: Arc<MetricStore>,
        machine: Arc<AlertStateMachine>,
        interval: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = EvaluatorActor::new(store, machine, interval, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Evaluate the latest sample immediately
    pub async fn evaluate_now(&self) -> Result<Vec<AlertTransition>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EvaluatorCommand::EvaluateNow { respond_to: tx })
            .await
            .context("failed to send EvaluateNow command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(EvaluatorCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(EvaluatorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        self.sender.closed().await;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
