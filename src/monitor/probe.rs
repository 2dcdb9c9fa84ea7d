// src/monitor/probe.rs
use super::ScheduledCheck;
use crate::health::{
    ApplicationHealthReport, CheckKey, ClusterHealthReport, DeployedApplicationHealthReport,
    DeployedServicePackageHealthReport, HealthInformation, HealthReport, HealthReportKind,
    HealthState, NodeHealthReport, PartitionHealthReport, ServiceHealthReport,
    StatefulServiceReplicaHealthReport, StatelessServiceInstanceHealthReport,
};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// A probe callback producing the report type `R`.
pub type ProbeFn<R> =
    Box<dyn Fn(CheckContext<R>) -> BoxFuture<'static, anyhow::Result<R>> + Send + Sync>;

/// What a probe callback receives on every execution.
///
/// The type parameter ties the context to the report kind the probe must
/// return.
pub struct CheckContext<R> {
    check: Arc<ScheduledCheck>,
    _report: PhantomData<fn() -> R>,
}

impl<R> CheckContext<R> {
    pub(crate) fn new(check: Arc<ScheduledCheck>) -> Self {
        Self {
            check,
            _report: PhantomData,
        }
    }

    pub fn source_id(&self) -> &str {
        self.check.source_id()
    }

    pub fn key(&self) -> &CheckKey {
        self.check.key()
    }

    pub fn kind(&self) -> HealthReportKind {
        self.check.kind()
    }

    pub fn property(&self) -> &str {
        self.check.property()
    }

    pub fn frequency(&self) -> Duration {
        self.check.frequency()
    }

    /// 1-based number of the execution in progress.
    pub fn execution(&self) -> u64 {
        self.check.executions()
    }

    /// Starts a [`HealthInformation`] pre-filled with this check's source and
    /// property.
    pub fn health_information(&self, state: HealthState, time_to_live: Duration) -> HealthInformation {
        HealthInformation::new(self.source_id(), self.property(), state, time_to_live)
    }

    /// The check this execution belongs to, e.g. to remove it from inside
    /// the probe.
    pub fn check(&self) -> &Arc<ScheduledCheck> {
        &self.check
    }
}

impl<R> Clone for CheckContext<R> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.check))
    }
}

impl<R> fmt::Debug for CheckContext<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckContext")
            .field("key", self.key())
            .field("source_id", &self.source_id())
            .finish()
    }
}

/// A report type that one kind of probe returns.
///
/// Implemented for the nine entity reports; the implementation picks which
/// [`Probe`] variant a callback is stored in.
pub trait EntityReport: Into<HealthReport> + Send + Sized + 'static {
    const KIND: HealthReportKind;

    fn into_probe(probe: ProbeFn<Self>) -> Probe;
}

/// Type-erased probe callback, one variant per [`HealthReportKind`].
pub enum Probe {
    Cluster(ProbeFn<ClusterHealthReport>),
    Partition(ProbeFn<PartitionHealthReport>),
    StatefulServiceReplica(ProbeFn<StatefulServiceReplicaHealthReport>),
    StatelessServiceInstance(ProbeFn<StatelessServiceInstanceHealthReport>),
    Node(ProbeFn<NodeHealthReport>),
    Service(ProbeFn<ServiceHealthReport>),
    Application(ProbeFn<ApplicationHealthReport>),
    DeployedApplication(ProbeFn<DeployedApplicationHealthReport>),
    DeployedServicePackage(ProbeFn<DeployedServicePackageHealthReport>),
}

impl Probe {
    /// Wraps an async callback; the variant follows from the report type.
    pub fn new<R, F, Fut>(probe: F) -> Self
    where
        R: EntityReport,
        F: Fn(CheckContext<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        R::into_probe(Box::new(move |ctx: CheckContext<R>| probe(ctx).boxed()))
    }

    pub fn kind(&self) -> HealthReportKind {
        match self {
            Probe::Cluster(_) => HealthReportKind::Cluster,
            Probe::Partition(_) => HealthReportKind::Partition,
            Probe::StatefulServiceReplica(_) => HealthReportKind::StatefulServiceReplica,
            Probe::StatelessServiceInstance(_) => HealthReportKind::StatelessServiceInstance,
            Probe::Node(_) => HealthReportKind::Node,
            Probe::Service(_) => HealthReportKind::Service,
            Probe::Application(_) => HealthReportKind::Application,
            Probe::DeployedApplication(_) => HealthReportKind::DeployedApplication,
            Probe::DeployedServicePackage(_) => HealthReportKind::DeployedServicePackage,
        }
    }

    pub(crate) fn execute(
        &self,
        check: Arc<ScheduledCheck>,
    ) -> BoxFuture<'static, anyhow::Result<HealthReport>> {
        match self {
            Probe::Cluster(probe) => invoke(probe, check),
            Probe::Partition(probe) => invoke(probe, check),
            Probe::StatefulServiceReplica(probe) => invoke(probe, check),
            Probe::StatelessServiceInstance(probe) => invoke(probe, check),
            Probe::Node(probe) => invoke(probe, check),
            Probe::Service(probe) => invoke(probe, check),
            Probe::Application(probe) => invoke(probe, check),
            Probe::DeployedApplication(probe) => invoke(probe, check),
            Probe::DeployedServicePackage(probe) => invoke(probe, check),
        }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Probe").field(&self.kind()).finish()
    }
}

fn invoke<R: EntityReport>(
    probe: &ProbeFn<R>,
    check: Arc<ScheduledCheck>,
) -> BoxFuture<'static, anyhow::Result<HealthReport>> {
    probe(CheckContext::new(check))
        .map(|result| result.map(Into::<HealthReport>::into))
        .boxed()
}

impl EntityReport for ClusterHealthReport {
    const KIND: HealthReportKind = HealthReportKind::Cluster;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::Cluster(probe)
    }
}

impl EntityReport for PartitionHealthReport {
    const KIND: HealthReportKind = HealthReportKind::Partition;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::Partition(probe)
    }
}

impl EntityReport for StatefulServiceReplicaHealthReport {
    const KIND: HealthReportKind = HealthReportKind::StatefulServiceReplica;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::StatefulServiceReplica(probe)
    }
}

impl EntityReport for StatelessServiceInstanceHealthReport {
    const KIND: HealthReportKind = HealthReportKind::StatelessServiceInstance;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::StatelessServiceInstance(probe)
    }
}

impl EntityReport for NodeHealthReport {
    const KIND: HealthReportKind = HealthReportKind::Node;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::Node(probe)
    }
}

impl EntityReport for ServiceHealthReport {
    const KIND: HealthReportKind = HealthReportKind::Service;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::Service(probe)
    }
}

impl EntityReport for ApplicationHealthReport {
    const KIND: HealthReportKind = HealthReportKind::Application;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::Application(probe)
    }
}

impl EntityReport for DeployedApplicationHealthReport {
    const KIND: HealthReportKind = HealthReportKind::DeployedApplication;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::DeployedApplication(probe)
    }
}

impl EntityReport for DeployedServicePackageHealthReport {
    const KIND: HealthReportKind = HealthReportKind::DeployedServicePackage;

    fn into_probe(probe: ProbeFn<Self>) -> Probe {
        Probe::DeployedServicePackage(probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_follows_report_type() {
        let probe = Probe::new(|ctx: CheckContext<NodeHealthReport>| async move {
            let info = ctx.health_information(HealthState::Ok, Duration::from_secs(30));
            anyhow::Ok(NodeHealthReport::new("_Node_0", info))
        });
        assert_eq!(probe.kind(), HealthReportKind::Node);
        assert!(matches!(probe, Probe::Node(_)));

        let probe = Probe::new(|ctx: CheckContext<ClusterHealthReport>| async move {
            let info = ctx.health_information(HealthState::Error, Duration::from_secs(100));
            anyhow::Ok(ClusterHealthReport::new(info))
        });
        assert_eq!(probe.kind(), HealthReportKind::Cluster);
    }

    #[test]
    fn test_kind_constants_match_variants() {
        assert_eq!(ServiceHealthReport::KIND, HealthReportKind::Service);
        assert_eq!(
            DeployedServicePackageHealthReport::KIND,
            HealthReportKind::DeployedServicePackage
        );
        assert_eq!(
            StatefulServiceReplicaHealthReport::KIND,
            HealthReportKind::StatefulServiceReplica
        );
    }
}
