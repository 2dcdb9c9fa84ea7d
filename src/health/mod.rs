// src/health/mod.rs
mod kind;
mod report;
mod status;

pub use kind::{CheckKey, HealthReportKind};
pub use report::{
    ApplicationHealthReport, ClusterHealthReport, DeployedApplicationHealthReport,
    DeployedServicePackageHealthReport, HealthInformation, HealthReport, NodeHealthReport,
    PartitionHealthReport, SequenceNumber, ServiceHealthReport,
    StatefulServiceReplicaHealthReport, StatelessServiceInstanceHealthReport,
};
pub use status::HealthState;
