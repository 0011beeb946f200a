mod api;
mod classifier;
mod config;
mod dispatcher;
mod error;
mod notify;
mod source;
mod timefmt;
mod tracker;
mod types;

#[cfg(test)]
mod testlog;

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{self, ApiState};
use crate::api::{HealthState, LatencyStats};
use crate::config::{Cli, Config};
use crate::dispatcher::Dispatcher;
use crate::error::{AppError, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cfg = match Config::from_cli(Cli::parse()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&cfg) {
        eprintln!("Logging setup failed: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(cfg: &Config) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&cfg.log_level));
    match &cfg.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::Config(format!("cannot open log file {}: {e}", path.display())))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

async fn run(cfg: Config) -> Result<()> {
    let source = source::connect(&cfg).await?;
    let sink = notify::sink::from_target(&cfg.printer);
    info!(
        "Polling every {}s, printing to {}",
        cfg.poll_interval.as_secs(),
        cfg.printer,
    );

    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());

    if let Some(port) = cfg.status_port {
        let state = ApiState {
            health: Arc::clone(&health),
            latency: Arc::clone(&latency),
        };
        tokio::spawn(async move {
            if let Err(e) = routes::serve(port, state).await {
                error!("Status API stopped: {e}");
            }
        });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    Dispatcher::new(source, sink, cfg.poll_interval, shutdown_rx, health, latency)
        .run()
        .await
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!("Cannot install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
