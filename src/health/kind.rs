// src/health/kind.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// The resource categories a health check can report against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthReportKind {
    Cluster,
    Partition,
    StatefulServiceReplica,
    StatelessServiceInstance,
    Node,
    Service,
    Application,
    DeployedApplication,
    DeployedServicePackage,
}

impl HealthReportKind {
    pub const ALL: [HealthReportKind; 9] = [
        HealthReportKind::Cluster,
        HealthReportKind::Partition,
        HealthReportKind::StatefulServiceReplica,
        HealthReportKind::StatelessServiceInstance,
        HealthReportKind::Node,
        HealthReportKind::Service,
        HealthReportKind::Application,
        HealthReportKind::DeployedApplication,
        HealthReportKind::DeployedServicePackage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthReportKind::Cluster => "Cluster",
            HealthReportKind::Partition => "Partition",
            HealthReportKind::StatefulServiceReplica => "StatefulServiceReplica",
            HealthReportKind::StatelessServiceInstance => "StatelessServiceInstance",
            HealthReportKind::Node => "Node",
            HealthReportKind::Service => "Service",
            HealthReportKind::Application => "Application",
            HealthReportKind::DeployedApplication => "DeployedApplication",
            HealthReportKind::DeployedServicePackage => "DeployedServicePackage",
        }
    }
}

impl fmt::Display for HealthReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a registered check. Unique per monitor.
///
/// The canonical string form is `"{Kind}_{Property}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckKey {
    pub kind: HealthReportKind,
    pub property: String,
}

impl CheckKey {
    pub fn new(kind: HealthReportKind, property: impl Into<String>) -> Self {
        Self {
            kind,
            property: property.into(),
        }
    }
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.property)
    }
}
