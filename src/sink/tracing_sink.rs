// src/sink/tracing_sink.rs
use super::{ReportSink, SinkError};
use crate::health::{HealthReport, HealthState};
use async_trait::async_trait;
use tracing::{info, warn};

/// Writes each report to the log. Used when no health store is available.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportSink for TracingSink {
    async fn submit(&self, source_id: &str, report: HealthReport) -> Result<(), SinkError> {
        let information = report.information();
        let entity = report.entity();
        let description = information.description().unwrap_or("");

        match information.health_state() {
            HealthState::Ok => info!(
                source_id,
                kind = %report.kind(),
                %entity,
                property = information.property(),
                ttl = ?information.time_to_live(),
                "health report: Ok {}", description
            ),
            state => warn!(
                source_id,
                kind = %report.kind(),
                %entity,
                property = information.property(),
                ttl = ?information.time_to_live(),
                "health report: {} {}", state, description
            ),
        }

        Ok(())
    }
}
