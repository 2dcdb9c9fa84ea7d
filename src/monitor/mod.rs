//! Periodic health-check scheduling.
//!
//! ```text
//! HealthMonitor (registry, DashMap<CheckKey, Arc<ScheduledCheck>>)
//!   └── ScheduledCheck, one Tokio task each
//!       ├── sleep(frequency)          Idle
//!       ├── Probe::execute()          Running
//!       │   └── Ok(report) → HealthMonitor::report → ReportSink
//!       └── rearm for now + frequency Idle
//! ```
//!
//! Probe failures and panics are logged and never stop the timer. Removing a
//! check cancels its next fire but lets an in-flight execution finish; any
//! report that execution produces is dropped.

mod check;
mod error;
mod probe;
mod registry;

pub use check::{CheckState, ScheduledCheck};
pub use error::MonitorError;
pub use probe::{CheckContext, EntityReport, Probe, ProbeFn};
pub use registry::HealthMonitor;
