// src/monitor/error.rs
use crate::health::{CheckKey, HealthReportKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("A health check with Kind={kind} and Property={property} was already registered")]
    DuplicateRegistration {
        kind: HealthReportKind,
        property: String,
    },

    #[error("Health check {key} needs a frequency greater than zero")]
    InvalidFrequency { key: CheckKey },
}
