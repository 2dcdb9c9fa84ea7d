// src/probe/policy.rs
use crate::health::HealthState;
use std::time::Duration;

/// What a single request to the probe target produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target answered successfully after `elapsed`.
    Responded(Duration),
    /// Timeout, connection error or non-success status.
    Failed(String),
}

/// Maps a probe outcome to a health verdict.
pub trait HealthPolicy: Send + Sync {
    fn evaluate(&self, outcome: &ProbeOutcome) -> HealthState;
}

/// `Ok` below the threshold, `Warning` at or above it, `Error` on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyThresholdPolicy {
    warning_after: Duration,
}

impl LatencyThresholdPolicy {
    pub fn new(warning_after: Duration) -> Self {
        Self { warning_after }
    }

    pub fn warning_after(&self) -> Duration {
        self.warning_after
    }
}

impl Default for LatencyThresholdPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

impl HealthPolicy for LatencyThresholdPolicy {
    fn evaluate(&self, outcome: &ProbeOutcome) -> HealthState {
        match outcome {
            ProbeOutcome::Responded(elapsed) if *elapsed < self.warning_after => HealthState::Ok,
            ProbeOutcome::Responded(_) => HealthState::Warning,
            ProbeOutcome::Failed(_) => HealthState::Error,
        }
    }
}
