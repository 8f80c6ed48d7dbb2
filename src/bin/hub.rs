use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::{
    actors::SampleEvent,
    alerts::build_sink,
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, StorageConfig, read_config_file},
    service::MonitoringService,
    sources::{LogFileProbe, ProbeSource, SysinfoProbe},
    util::{get_bind_addr, get_data_dir},
};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Collects host metrics and raises threshold alerts")]
struct Args {
    /// Config file (JSON); built-in defaults when omitted
    #[arg(short, long)]
    file: Option<String>,

    /// Log level for the engine
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Collect and evaluate once, print the health report and exit
    #[arg(long)]
    once: bool,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("vigil", level),
        ("vigil_hub", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => {
            debug!("no config file given, using defaults");
            Config::default()
        }
    };

    if let Some(bind_addr) = get_bind_addr() {
        debug!("bind address overridden from environment: {bind_addr}");
        config.api.bind_addr = bind_addr;
    }

    if let Some(dir) = get_data_dir() {
        match &mut config.storage {
            StorageConfig::Json { data_dir, .. } => {
                debug!("data directory overridden from environment: {}", dir.display());
                *data_dir = dir;
            }
            StorageConfig::None { .. } => {
                warn!("ignoring data directory override, storage backend is 'none'");
            }
        }
    }

    Ok(config)
}

fn log_file(config: &Config) -> PathBuf {
    config.application.log_file.clone()
}

/// Trace every stored sample
async fn log_samples(mut samples: broadcast::Receiver<SampleEvent>) {
    loop {
        match samples.recv().await {
            Ok(event) => trace!(
                "stored sample taken at {} (cpu: {:?}, memory: {:?})",
                event.sample.timestamp,
                event.sample.get("cpu.usage_percent"),
                event.sample.get("memory.usage_percent"),
            ),
            Err(RecvError::Lagged(skipped)) => warn!("sample log lagging, skipped {skipped} samples"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init(args.log_level);
    trace!("started with args: {args:?}");

    let config = load_config(&args)?;

    let source = ProbeSource::new(SysinfoProbe::new()).with_application(LogFileProbe::new(
        log_file(&config),
        chrono::Duration::minutes(config.application.window_minutes as i64),
    ));
    let sink = build_sink(&config.alerts);

    let service = Arc::new(MonitoringService::open(&config, Arc::new(source), sink).await?);

    if args.once {
        service.collect_now().await?;
        service.evaluate_now().await?;

        let report = service.get_health_status().await;
        println!("{}", serde_json::to_string_pretty(&report)?);

        service.shutdown().await;
        return Ok(());
    }

    tokio::spawn(log_samples(service.subscribe()));

    let addr = spawn_api_server(ApiConfig::from(&config.api), ApiState::new(service.clone())).await?;
    info!("serving health and metrics on http://{addr}/api/v1/health");

    tokio::signal::ctrl_c().await?;
    info!("received ctrl-c, shutting down");

    service.shutdown().await;

    Ok(())
}
