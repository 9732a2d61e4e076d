//! TruckLink entry point and runtime setup.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod admin;
mod app;
mod booking;
mod catalog;
mod clock;
mod config;
mod driver;
mod error;
mod events;
mod fare;
mod input;
mod layout;
mod load;
mod notify;
mod quote;
mod routing;
mod shortcuts;
mod suggest;
mod tracking;
mod ui;
mod users;
mod wizard;
mod worker;

/// File logging; the guard must outlive the app.
fn init_logging() -> Result<WorkerGuard> {
    let log_file = "trucklink.log";
    // stdout belongs to the TUI.
    let file_appender = tracing_appender::rolling::never(".", log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", log_file);
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logging()?;
    tracing::info!("trucklink starting");
    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal).await;
    ui::restore_terminal()?;
    if let Err(ref e) = res {
        tracing::error!("app error: {e:#}");
    }
    tracing::info!("trucklink exiting");
    res
}
