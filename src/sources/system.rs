use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use sysinfo::{Disks, Networks, System};
use tracing::trace;

use crate::{CpuMetrics, DiskMetrics, MemoryMetrics, NetworkMetrics};

use super::SystemProbe;

/// [`SystemProbe`] backed by `sysinfo`
///
/// Refreshes are blocking and run on the blocking thread pool.
#[derive(Clone)]
pub struct SysinfoProbe {
    system: Arc<Mutex<System>>,
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
        }
    }

    async fn with_system<T, F>(&self, probe: &'static str, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut System) -> anyhow::Result<T> + Send + 'static,
    {
        let system = self.system.clone();

        tokio::task::spawn_blocking(move || {
            let mut system = system
                .lock()
                .map_err(|_| anyhow::anyhow!("system state poisoned"))?;
            f(&mut *system)
        })
        .await
        .with_context(|| format!("{probe} probe task failed"))?
    }
}

#[async_trait]
impl SystemProbe for SysinfoProbe {
    async fn cpu(&self) -> anyhow::Result<CpuMetrics> {
        self.with_system("cpu", |system| {
            // usage is computed from the difference between two refreshes
            system.refresh_cpu_usage();
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            system.refresh_cpu_usage();

            let usage = system.global_cpu_usage() as f64;
            let load = System::load_average().one;
            trace!("cpu usage {usage:.2}%, load {load:.2}");

            Ok(CpuMetrics::new(usage, Some(load)))
        })
        .await
    }

    async fn memory(&self) -> anyhow::Result<MemoryMetrics> {
        self.with_system("memory", |system| {
            system.refresh_memory();
            MemoryMetrics::from_bytes(system.total_memory(), system.used_memory())
                .context("total memory reported as zero")
        })
        .await
    }

    async fn disk(&self) -> anyhow::Result<DiskMetrics> {
        tokio::task::spawn_blocking(|| {
            let disks = Disks::new_with_refreshed_list();
            let disk = disks.list().first().context("no disks reported")?;

            let total = disk.total_space();
            let used = total.saturating_sub(disk.available_space());
            trace!("disk {:?}: {used}/{total} bytes used", disk.mount_point());

            DiskMetrics::from_bytes(total, used).context("disk size reported as zero")
        })
        .await
        .context("disk probe task failed")?
    }

    async fn network(&self) -> anyhow::Result<NetworkMetrics> {
        tokio::task::spawn_blocking(|| {
            let networks = Networks::new_with_refreshed_list();
            if networks.list().is_empty() {
                anyhow::bail!("no network interfaces reported");
            }

            let (bytes_in, bytes_out) = networks
                .list()
                .values()
                .fold((0u64, 0u64), |(rx, tx), data| {
                    (
                        rx.saturating_add(data.total_received()),
                        tx.saturating_add(data.total_transmitted()),
                    )
                });

            Ok(NetworkMetrics {
                bytes_in,
                bytes_out,
            })
        })
        .await
        .context("network probe task failed")?
    }
}
