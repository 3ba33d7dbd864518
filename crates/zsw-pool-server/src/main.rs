#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::config::{CliArgs, PoolServerConfig};
use server::pool::build_pool;
use server::telemetry::init_telemetry;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = PoolServerConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let mut pool = build_pool(&config)?;
    tracing::info!(
        instance_id = pool.instance_id(),
        master_pid = pool.master_pid(),
        "Starting process pool"
    );
    pool.start().await?;

    shutdown_signal().await;
    pool.driver_mut().shutdown().await;

    tracing::info!("Process pool shut down successfully");
    Ok(())
}

fn log_startup_info(config: &PoolServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting zsw-pool with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting zsw-pool in {} with {} workers",
            config.unix_dir.display(),
            config.workers.len()
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
