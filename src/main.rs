// src/main.rs
use anyhow::{Context, Result};
use fabric_health_monitor::{
    config::{self, MonitorConfig},
    metrics::MetricsRegistry,
    probe::PerformanceProbe,
    server::{MetricsHandler, ServerBuilder},
    sink::TracingSink,
    HealthMonitor,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fabric_health_monitor=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    if let Err(e) = run().await {
        error!("Monitor service failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let port: u16 = args
        .next()
        .context("An http port # is needed to be passed in the argument")?
        .parse()
        .context("The http port must be a number")?;

    // Load configuration
    let mut config = match args.next() {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            config::load_config(&path).await?
        }
        None => MonitorConfig::default(),
    };
    config.target.port = port;
    config.validate()?;

    let source_id = config.source_id.clone().unwrap_or_else(default_source_id);

    // Initialize metrics
    let metrics_registry = Arc::new(MetricsRegistry::new()?);
    if config.metrics.enabled {
        let addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        let handler = MetricsHandler::new(metrics_registry.clone(), config.metrics.path.clone());
        info!("Metrics server on http://{}{}", addr, config.metrics.path);

        tokio::spawn(async move {
            if let Err(e) = ServerBuilder::new(addr).with_handler(handler).serve().await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    // Delay a bit before starting to monitor
    tokio::time::sleep(config.startup_delay()).await;

    let monitor = HealthMonitor::with_metrics(
        source_id,
        Arc::new(TracingSink::new()),
        Some(metrics_registry.collector()),
    );

    let probe = Arc::new(PerformanceProbe::from_config(&config)?);
    info!(
        source_id = monitor.source_id(),
        target = %probe.url(),
        "starting health monitor"
    );
    probe.register(
        &monitor,
        config.performance_check.frequency(),
        config.performance_check.property.clone(),
    )?;

    shutdown_signal().await;

    for (key, check) in monitor.checks() {
        info!(check = %key, executions = check.executions(), "removing health check");
        check.remove();
    }

    if !monitor.is_empty() {
        warn!(remaining = monitor.len(), "health checks still registered at exit");
    }

    Ok(())
}

fn default_source_id() -> String {
    std::env::args()
        .next()
        .as_deref()
        .and_then(|exe| Path::new(exe).file_stem())
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "health-monitor".to_string())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
