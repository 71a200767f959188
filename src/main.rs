//! # tunewatch
//!
//! ## Startup
//!
//! 1. Parse the command line and initialise tracing
//! 2. Load and validate the config file
//! 3. Configure object storage and build the job service client
//! 4. Start the watch loop
//! 5. Serve the HTTP API
//!
//! ## Shutdown
//!
//! SIGTERM/SIGINT stop the HTTP server first. In-flight requests get
//! `--grace-period` seconds to finish; then the watch loop is stopped after
//! its current step and the report sink is closed.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tunewatch::{AppConfig, Cli, shutdown};
use tunewatch_aicc::{AiccClient, AiccProvider, HttpReportSink, ObsHelper};
use tunewatch_reconciler::Watcher;
use tunewatch_web::{AppState, FinetuneService, run_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    info!(config = %cli.config.display(), "tunewatch starting");

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    let storage = ObsHelper::new(config.obs.clone(), config.upload.clone());
    storage
        .init()
        .await
        .context("Failed to configure object storage")?;

    let client = AiccClient::with_config(config.aicc.clone())
        .context("Failed to build job service client")?;
    let provider = Arc::new(AiccProvider::new(client, storage, config.finetune.clone()));
    let sink = Arc::new(
        HttpReportSink::with_config(&config.report).context("Failed to build report sink")?,
    );

    let watcher = Arc::new(
        Watcher::start(&config.watch, provider.clone(), sink)
            .context("Failed to start watch loop")?,
    );
    info!(
        interval_secs = config.watch.interval().as_secs(),
        timeout_secs = config.watch.timeout(),
        capacity = watcher.max(),
        "Watch loop started"
    );

    let host: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server host {}", config.server.host))?;
    let addr = SocketAddr::new(host, cli.port);

    let state = AppState::new(FinetuneService::new(Arc::clone(&watcher), provider));
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut server = tokio::spawn(run_server(addr, state, async move {
        let _ = stop_rx.changed().await;
    }));

    let served = tokio::select! {
        result = &mut server => result.context("HTTP server task failed")?
            .context("HTTP server failed"),
        () = shutdown::wait_for_signal() => {
            stop_tx.send_replace(true);
            match tokio::time::timeout(cli.grace_period(), &mut server).await {
                Ok(result) => result.context("HTTP server task failed")?
                    .context("HTTP server failed"),
                Err(_) => {
                    warn!(
                        grace_period_secs = cli.grace_period,
                        "In-flight requests did not finish in time"
                    );
                    server.abort();
                    Ok(())
                }
            }
        }
    };

    info!("Stopping watch loop...");
    if let Some(stats) = watcher.exit().await {
        info!(
            laps = stats.laps,
            checks = stats.checks,
            reports_sent = stats.reports_sent,
            reports_failed = stats.reports_failed,
            retired = stats.retired,
            tracked = watcher.current(),
            "Watch loop stopped"
        );
    }

    served?;
    info!("tunewatch stopped gracefully");
    Ok(())
}

/// Initialize tracing subscriber; `RUST_LOG` wins over `default_level`.
fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
