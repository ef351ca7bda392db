//! `cdr-collect` daemon.
//!
//! Accepts call detail record streams from a PBX and forwards every record
//! to the UTM5 billing sender.

use std::process::ExitCode;

use cdr_collect::{cli::Cli, config::CollectorConfig, server::CollectorServer};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // The library never installs a subscriber; the binary owns log output.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "cdr-collect stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CollectorConfig::from_cli(cli)?;
    tracing::info!(
        storage = %config.storage.root().display(),
        sender = %config.sender.program().display(),
        policy = ?config.failure_policy,
        "starting cdr-collect"
    );
    install_metrics(&config)?;

    let server = CollectorServer::new(config.exporter())
        .max_chunk_length(config.max_chunk_length)
        .bind(config.listen)?;
    if let Some(addr) = server.local_addr() {
        tracing::info!(%addr, "listening for switch connections");
    }
    server.run().await?;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics(config: &CollectorConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(addr) = config.metrics_address {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "serving Prometheus metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(config: &CollectorConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.metrics_address.is_some() {
        tracing::warn!("built without the metrics feature; ignoring --metrics-address");
    }
    Ok(())
}
