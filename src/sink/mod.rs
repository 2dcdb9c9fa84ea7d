// src/sink/mod.rs
mod memory;
mod tracing_sink;

pub use memory::MemorySink;
pub use tracing_sink::TracingSink;

use crate::health::HealthReport;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Report sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for health reports produced by the monitor.
///
/// Delivery is best effort; the monitor logs and swallows any error.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, source_id: &str, report: HealthReport) -> Result<(), SinkError>;
}
