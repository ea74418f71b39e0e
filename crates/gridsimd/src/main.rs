//! gridsimd — the gridsim daemon.
//!
//! Single binary that assembles the sandbox, its scheduling loop, and
//! the recommendation API:
//! - In-memory sandbox cluster
//! - Sandbox scheduler loop
//! - REST API (sandbox prep + recommendations)
//!
//! # Usage
//!
//! ```text
//! gridsimd serve --port 8080 --config gridsim.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use gridsim_core::GridsimConfig;
use gridsim_recommender::StrategyWeights;
use gridsim_sandbox::{Sandbox, Scheduler};

#[derive(Parser)]
#[command(name = "gridsimd", about = "gridsim daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sandbox scheduler and recommendation API.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Path to the gridsim configuration file.
        #[arg(long, default_value = "gridsim.toml")]
        config: PathBuf,

        /// Sandbox scheduler pass interval in milliseconds.
        #[arg(long, default_value = "200")]
        scheduler_interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gridsimd=debug,gridsim=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port, config, scheduler_interval } => {
            run_serve(port, config, scheduler_interval).await
        }
    }
}

async fn run_serve(port: u16, config: PathBuf, scheduler_interval: u64) -> anyhow::Result<()> {
    info!("gridsim daemon starting");

    let config = GridsimConfig::from_file(&config)?;
    let catalog = config.catalog();
    info!(
        cluster = %config.cluster.name,
        pools = config.cluster.worker_pools.len(),
        machine_types = config.machines.len(),
        "configuration loaded"
    );

    let sandbox = Sandbox::new();
    let seeded = sandbox.seed_from_spec(&config.cluster, &catalog).await?;
    info!(nodes = seeded, "sandbox seeded from cluster spec");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_shutdown = shutdown_rx.clone();

    // ── Sandbox scheduler loop ─────────────────────────────────

    let scheduler = Scheduler::new(sandbox.clone());
    let scheduler_handle = tokio::spawn(async move {
        scheduler
            .run(Duration::from_millis(scheduler_interval), scheduler_shutdown)
            .await;
    });
    info!(interval_millis = scheduler_interval, "sandbox scheduler started");

    // ── API server ─────────────────────────────────────────────

    let state = gridsim_api::ApiState {
        sandbox,
        cluster: config.cluster,
        catalog,
        weights: StrategyWeights { waste: config.weights.waste, cost: config.weights.cost },
        settings: config.trial,
        cancel: shutdown_rx,
    };
    let router = gridsim_api::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for background tasks.
    let _ = scheduler_handle.await;

    info!("gridsim daemon stopped");
    Ok(())
}
