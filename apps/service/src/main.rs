use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use vigil_service::audit::AuditLogger;
use vigil_service::config::Config;
use vigil_service::monitoring::{Engine, EngineConfig, SystemClock};
use vigil_service::notifier::TwilioNotifier;
use vigil_service::store::FileStore;

/// Endpoint uptime monitoring service
#[derive(Parser)]
#[command(name = "vigil-service", version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::from_config(args.config.as_deref()).context("loading configuration")?;
    tracing::debug!("{config}");

    let store = Arc::new(FileStore::new(&config.storage.data_dir));
    let notifier = Arc::new(TwilioNotifier::new(&config.twilio).context("building notifier")?);
    let audit = AuditLogger::new(&config.storage.logs_dir);

    let engine = Arc::new(
        Engine::new(
            store,
            notifier,
            Arc::new(SystemClock),
            audit,
            EngineConfig {
                sweep_interval: Duration::from_secs(config.engine.sweep_interval_seconds),
                rotation_interval: Duration::from_secs(config.engine.rotation_interval_seconds),
            },
        )
        .context("building engine")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(engine.run(shutdown_rx));

    signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("shutdown requested, draining in-flight work");
    let _ = shutdown_tx.send(true);
    runner.await.context("engine task panicked")?;

    Ok(())
}
