//! Metric sources
//!
//! A [`MetricsSource`] produces one [`MetricSample`] per collection tick. The
//! default source, [`ProbeSource`], is assembled from a [`SystemProbe`] and an
//! optional [`ApplicationProbe`]:
//!
//! ```text
//!            ┌── cpu ──────┐
//!            ├── memory ───┤
//! sample() ──┼── disk ─────┼──▶ MetricSample (failed probes left empty)
//!            ├── network ──┤
//!            └── app ──────┘
//! ```

pub mod application;
pub mod system;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{instrument, warn};

use crate::{
    ApplicationMetrics, CpuMetrics, DiskMetrics, MemoryMetrics, MetricSample, NetworkMetrics,
    SystemMetrics,
};

pub use application::LogFileProbe;
pub use system::SysinfoProbe;

/// Produces metric samples for the collector
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Take one sample. Implementations should degrade to a partial sample
    /// rather than fail when only some of their probes fail.
    async fn sample(&self) -> anyhow::Result<MetricSample>;
}

/// Host-level probes
#[async_trait]
pub trait SystemProbe: Send + Sync {
    async fn cpu(&self) -> anyhow::Result<CpuMetrics>;
    async fn memory(&self) -> anyhow::Result<MemoryMetrics>;
    async fn disk(&self) -> anyhow::Result<DiskMetrics>;
    async fn network(&self) -> anyhow::Result<NetworkMetrics>;
}

/// Probe for the monitored application's request statistics
#[async_trait]
pub trait ApplicationProbe: Send + Sync {
    async fn application(&self) -> anyhow::Result<ApplicationMetrics>;
}

/// [`MetricsSource`] running all probes concurrently
pub struct ProbeSource<S, A = LogFileProbe> {
    system: S,
    application: Option<A>,
}

impl<S: SystemProbe> ProbeSource<S> {
    pub fn new(system: S) -> Self {
        Self {
            system,
            application: None,
        }
    }
}

impl<S: SystemProbe, A: ApplicationProbe> ProbeSource<S, A> {
    pub fn with_application<B: ApplicationProbe>(self, application: B) -> ProbeSource<S, B> {
        ProbeSource {
            system: self.system,
            application: Some(application),
        }
    }
}

fn degrade<T>(probe: &str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{probe} probe failed: {e:#}");
            None
        }
    }
}

#[async_trait]
impl<S: SystemProbe, A: ApplicationProbe> MetricsSource for ProbeSource<S, A> {
    #[instrument(skip_all)]
    async fn sample(&self) -> anyhow::Result<MetricSample> {
        let application = async {
            match &self.application {
                Some(probe) => Some(probe.application().await),
                None => None,
            }
        };

        let (cpu, memory, disk, network, application) = tokio::join!(
            self.system.cpu(),
            self.system.memory(),
            self.system.disk(),
            self.system.network(),
            application,
        );

        let system = SystemMetrics {
            cpu: degrade("cpu", cpu),
            memory: degrade("memory", memory),
            disk: degrade("disk", disk),
            network: degrade("network", network),
        };
        let application = application.and_then(|result| degrade("application", result));

        Ok(MetricSample::new(Utc::now(), system, application))
    }
}
