pub mod aggregation;
pub mod api;
pub mod db;
pub mod distributor;
pub mod error;
pub mod monitor;
pub mod posture;
pub mod settings;
pub mod utils;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use db::Database;
use distributor::ObserverHub;
use monitor::{BackgroundTasks, SeatMonitor};
use settings::Settings;

pub fn run() -> Result<()> {
    // Reads RUST_LOG, defaults to info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("seatwatch starting up...");

    let settings = Arc::new(Settings::load()?);
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(serve(settings))
}

async fn serve(settings: Arc<Settings>) -> Result<()> {
    let database = Database::new(settings.db_path.clone())?;
    let monitor = SeatMonitor::new(database, ObserverHub::new(), settings.clone()).await?;
    let tasks = BackgroundTasks::spawn(monitor.clone(), CancellationToken::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("listening on {addr}");

    axum::serve(listener, api::router(monitor))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    tasks.shutdown().await?;
    log::info!("seatwatch stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to install Ctrl-C handler: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("shutdown signal received");
}
