// src/probe/mod.rs
mod performance;
mod policy;

pub use performance::PerformanceProbe;
pub use policy::{HealthPolicy, LatencyThresholdPolicy, ProbeOutcome};
