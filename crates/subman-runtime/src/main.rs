//! `subman`: rates subscription manager responder.

use anyhow::{Context, Result};
use subman_runtime::{init_logging, RuntimeConfig, SubmanRuntime};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::load().context("failed to load configuration")?;
    init_logging(&config.telemetry).context("failed to initialize logging")?;

    match &config.source {
        Some(path) => info!(path = %path.display(), "Loaded properties file"),
        None => info!("No properties file, using environment only"),
    }

    let mut runtime = SubmanRuntime::new(config);
    runtime
        .start()
        .await
        .context("failed to start subscription manager")?;

    if let Err(e) = runtime.run_demo().await {
        warn!(error = %e, "Demo requester failed");
    }

    info!("Subscription manager is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
