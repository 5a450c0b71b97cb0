//! Budgetgate server: budget-request submissions and single-use approval
//! links over HTTP.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use budgetgate_core::config::{find_config_file, load_and_validate};
use budgetgate_server::{AppState, build_service, spawn_sweeper, start_server};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Command-line configuration.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Config {
    /// Path to the YAML configuration file.
    /// If not specified, searches: BUDGETGATE_CONFIG env, /etc/budgetgate/config.yaml, ./config.yaml
    #[arg(long, env = "BUDGETGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(short, long, env = "BUDGETGATE_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Listen port
    #[arg(short, long, env = "BUDGETGATE_PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The _guard must be held for the lifetime of the program to flush logs.
    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Config::parse();

    let config_path = match find_config_file(cli.config.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            error!(error = %e, "No configuration file found, refusing to start");
            std::process::exit(1);
        }
    };

    let (app_config, validation) = match load_and_validate(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(path = %config_path.display(), error = %e, "Invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };
    for warning in &validation.warnings {
        warn!(warning = %warning, "Configuration warning");
    }
    info!(path = %config_path.display(), "Configuration loaded");

    let service = match build_service(&app_config) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "Failed to assemble service, refusing to start");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let sweeper = spawn_sweeper(
        Arc::clone(&service.store),
        app_config.store.sweep_interval,
        shutdown.clone(),
    );

    let addr = SocketAddr::new(cli.bind, cli.port);
    let state = Arc::new(AppState::new(service.flow));
    let (bound, server) = start_server(addr, state, shutdown.clone()).await?;
    info!(addr = %bound, "Ready");

    match server.await {
        Ok(Ok(())) => info!("Server stopped"),
        Ok(Err(e)) => error!(error = %e, "Server error"),
        Err(e) => error!(error = %e, "Server task failed"),
    }

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Token sweeper did not stop cleanly");
    }

    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_sigint = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                shutdown_sigint.cancel();
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGINT");
            }
        }
    });

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("Received SIGTERM, initiating graceful shutdown");
                    shutdown.cancel();
                }
                Err(e) => {
                    error!(error = %e, "Failed to listen for SIGTERM");
                }
            }
        });
    }

    #[cfg(not(unix))]
    let _ = shutdown;
}
