// src/lib.rs
pub mod config;
pub mod health;
pub mod metrics;
pub mod monitor;
pub mod probe;
pub mod server;
pub mod sink;
pub mod target;

pub use health::{CheckKey, HealthReport, HealthReportKind, HealthState};
pub use monitor::{CheckContext, HealthMonitor, MonitorError};
pub use sink::ReportSink;
