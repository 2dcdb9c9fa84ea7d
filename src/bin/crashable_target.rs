//! src/bin/crashable_target.rs
//! Run: cargo run --bin crashable-target -- <port>

use anyhow::{Context, Result};
use fabric_health_monitor::server::ServerBuilder;
use fabric_health_monitor::target::{TargetHandler, TargetState};
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fabric_health_monitor=debug".parse()?),
        )
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .context("An http port # is needed to be passed in the argument")?
        .parse()
        .context("The http port must be a number")?;

    let state = TargetState::from_env();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(node = state.node(), "A simple crashable webserver on http://{}. Ctrl+C to quit.", addr);

    let server = ServerBuilder::new(addr)
        .with_handler(TargetHandler::new(state))
        .serve();

    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => info!("Stopping crashable webserver"),
    }

    Ok(())
}
