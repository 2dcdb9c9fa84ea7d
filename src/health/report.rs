// src/health/report.rs
use super::{HealthReportKind, HealthState};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Ordering hint for a report. `Auto` lets the sink assign a monotonic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SequenceNumber {
    #[default]
    Auto,
    Explicit(i64),
}

/// The health verdict itself, independent of which entity it describes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthInformation {
    source_id: String,
    property: String,
    health_state: HealthState,
    time_to_live: Duration,
    remove_when_expired: bool,
    description: Option<String>,
    sequence_number: SequenceNumber,
}

impl HealthInformation {
    pub fn new(
        source_id: impl Into<String>,
        property: impl Into<String>,
        health_state: HealthState,
        time_to_live: Duration,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            property: property.into(),
            health_state,
            time_to_live,
            remove_when_expired: false,
            description: None,
            sequence_number: SequenceNumber::Auto,
        }
    }

    pub fn with_remove_when_expired(mut self, remove_when_expired: bool) -> Self {
        self.remove_when_expired = remove_when_expired;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sequence_number(mut self, sequence_number: SequenceNumber) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn health_state(&self) -> HealthState {
        self.health_state
    }

    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    pub fn remove_when_expired(&self) -> bool {
        self.remove_when_expired
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterHealthReport {
    pub information: HealthInformation,
}

impl ClusterHealthReport {
    pub fn new(information: HealthInformation) -> Self {
        Self { information }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionHealthReport {
    pub partition_id: Uuid,
    pub information: HealthInformation,
}

impl PartitionHealthReport {
    pub fn new(partition_id: Uuid, information: HealthInformation) -> Self {
        Self {
            partition_id,
            information,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatefulServiceReplicaHealthReport {
    pub partition_id: Uuid,
    pub replica_id: i64,
    pub information: HealthInformation,
}

impl StatefulServiceReplicaHealthReport {
    pub fn new(partition_id: Uuid, replica_id: i64, information: HealthInformation) -> Self {
        Self {
            partition_id,
            replica_id,
            information,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatelessServiceInstanceHealthReport {
    pub partition_id: Uuid,
    pub instance_id: i64,
    pub information: HealthInformation,
}

impl StatelessServiceInstanceHealthReport {
    pub fn new(partition_id: Uuid, instance_id: i64, information: HealthInformation) -> Self {
        Self {
            partition_id,
            instance_id,
            information,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeHealthReport {
    pub node_name: String,
    pub information: HealthInformation,
}

impl NodeHealthReport {
    pub fn new(node_name: impl Into<String>, information: HealthInformation) -> Self {
        Self {
            node_name: node_name.into(),
            information,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceHealthReport {
    pub service_name: Url,
    pub information: HealthInformation,
}

impl ServiceHealthReport {
    pub fn new(service_name: Url, information: HealthInformation) -> Self {
        Self {
            service_name,
            information,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationHealthReport {
    pub application_name: Url,
    pub information: HealthInformation,
}

impl ApplicationHealthReport {
    pub fn new(application_name: Url, information: HealthInformation) -> Self {
        Self {
            application_name,
            information,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployedApplicationHealthReport {
    pub application_name: Url,
    pub node_name: String,
    pub information: HealthInformation,
}

impl DeployedApplicationHealthReport {
    pub fn new(
        application_name: Url,
        node_name: impl Into<String>,
        information: HealthInformation,
    ) -> Self {
        Self {
            application_name,
            node_name: node_name.into(),
            information,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployedServicePackageHealthReport {
    pub application_name: Url,
    pub service_manifest_name: String,
    pub node_name: String,
    pub information: HealthInformation,
}

impl DeployedServicePackageHealthReport {
    pub fn new(
        application_name: Url,
        service_manifest_name: impl Into<String>,
        node_name: impl Into<String>,
        information: HealthInformation,
    ) -> Self {
        Self {
            application_name,
            service_manifest_name: service_manifest_name.into(),
            node_name: node_name.into(),
            information,
        }
    }
}

/// A report of any kind, as handed to a [`ReportSink`](crate::sink::ReportSink).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum HealthReport {
    Cluster(ClusterHealthReport),
    Partition(PartitionHealthReport),
    StatefulServiceReplica(StatefulServiceReplicaHealthReport),
    StatelessServiceInstance(StatelessServiceInstanceHealthReport),
    Node(NodeHealthReport),
    Service(ServiceHealthReport),
    Application(ApplicationHealthReport),
    DeployedApplication(DeployedApplicationHealthReport),
    DeployedServicePackage(DeployedServicePackageHealthReport),
}

impl HealthReport {
    pub fn kind(&self) -> HealthReportKind {
        match self {
            HealthReport::Cluster(_) => HealthReportKind::Cluster,
            HealthReport::Partition(_) => HealthReportKind::Partition,
            HealthReport::StatefulServiceReplica(_) => HealthReportKind::StatefulServiceReplica,
            HealthReport::StatelessServiceInstance(_) => {
                HealthReportKind::StatelessServiceInstance
            }
            HealthReport::Node(_) => HealthReportKind::Node,
            HealthReport::Service(_) => HealthReportKind::Service,
            HealthReport::Application(_) => HealthReportKind::Application,
            HealthReport::DeployedApplication(_) => HealthReportKind::DeployedApplication,
            HealthReport::DeployedServicePackage(_) => HealthReportKind::DeployedServicePackage,
        }
    }

    pub fn information(&self) -> &HealthInformation {
        match self {
            HealthReport::Cluster(r) => &r.information,
            HealthReport::Partition(r) => &r.information,
            HealthReport::StatefulServiceReplica(r) => &r.information,
            HealthReport::StatelessServiceInstance(r) => &r.information,
            HealthReport::Node(r) => &r.information,
            HealthReport::Service(r) => &r.information,
            HealthReport::Application(r) => &r.information,
            HealthReport::DeployedApplication(r) => &r.information,
            HealthReport::DeployedServicePackage(r) => &r.information,
        }
    }

    pub fn health_state(&self) -> HealthState {
        self.information().health_state()
    }

    /// Human readable name of the entity the report describes.
    pub fn entity(&self) -> String {
        match self {
            HealthReport::Cluster(_) => "cluster".to_string(),
            HealthReport::Partition(r) => r.partition_id.to_string(),
            HealthReport::StatefulServiceReplica(r) => {
                format!("{}/{}", r.partition_id, r.replica_id)
            }
            HealthReport::StatelessServiceInstance(r) => {
                format!("{}/{}", r.partition_id, r.instance_id)
            }
            HealthReport::Node(r) => r.node_name.clone(),
            HealthReport::Service(r) => r.service_name.to_string(),
            HealthReport::Application(r) => r.application_name.to_string(),
            HealthReport::DeployedApplication(r) => {
                format!("{}@{}", r.application_name, r.node_name)
            }
            HealthReport::DeployedServicePackage(r) => format!(
                "{}/{}@{}",
                r.application_name, r.service_manifest_name, r.node_name
            ),
        }
    }
}

impl From<ClusterHealthReport> for HealthReport {
    fn from(report: ClusterHealthReport) -> Self {
        HealthReport::Cluster(report)
    }
}

impl From<PartitionHealthReport> for HealthReport {
    fn from(report: PartitionHealthReport) -> Self {
        HealthReport::Partition(report)
    }
}

impl From<StatefulServiceReplicaHealthReport> for HealthReport {
    fn from(report: StatefulServiceReplicaHealthReport) -> Self {
        HealthReport::StatefulServiceReplica(report)
    }
}

impl From<StatelessServiceInstanceHealthReport> for HealthReport {
    fn from(report: StatelessServiceInstanceHealthReport) -> Self {
        HealthReport::StatelessServiceInstance(report)
    }
}

impl From<NodeHealthReport> for HealthReport {
    fn from(report: NodeHealthReport) -> Self {
        HealthReport::Node(report)
    }
}

impl From<ServiceHealthReport> for HealthReport {
    fn from(report: ServiceHealthReport) -> Self {
        HealthReport::Service(report)
    }
}

impl From<ApplicationHealthReport> for HealthReport {
    fn from(report: ApplicationHealthReport) -> Self {
        HealthReport::Application(report)
    }
}

impl From<DeployedApplicationHealthReport> for HealthReport {
    fn from(report: DeployedApplicationHealthReport) -> Self {
        HealthReport::DeployedApplication(report)
    }
}

impl From<DeployedServicePackageHealthReport> for HealthReport {
    fn from(report: DeployedServicePackageHealthReport) -> Self {
        HealthReport::DeployedServicePackage(report)
    }
}
