//! Energy Monitor - industrial equipment telemetry service
//!
//! Simulates or ingests sensor readings for the device fleet, raises
//! threshold alerts and streams both to live subscribers.

use anyhow::{Context, Result};
use energy_monitor::{api, AppState, MonitorConfig};
use monitor_lib::health::HealthRegistry;
use monitor_lib::simulator::StartOutcome;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting energy-monitor");

    let config = MonitorConfig::load()?;
    info!(
        instance = %config.instance_name,
        port = config.api_port,
        "Monitor configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let state = Arc::new(
        AppState::build(&config, health_registry.clone())
            .context("Failed to build monitoring pipeline")?,
    );
    state
        .logger
        .log_startup(MONITOR_VERSION, state.registry.len());

    if config.autostart_simulation && state.simulator.start().await == StartOutcome::Started {
        info!("Simulation started at boot");
    }

    health_registry.set_ready(true).await;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let api_handle = tokio::spawn(api::serve(config.api_port, state.clone(), async {
        let _ = shutdown_rx.await;
    }));

    tokio::signal::ctrl_c().await?;
    state.logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;

    state.simulator.stop().await;
    state.hub.shutdown();
    let _ = shutdown_tx.send(());

    match api_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "API server failed"),
        Err(e) => error!(error = %e, "API server task panicked"),
    }

    info!("Shutting down");
    Ok(())
}
