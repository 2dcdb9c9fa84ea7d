// src/monitor/registry.rs
use super::{CheckContext, CheckState, EntityReport, MonitorError, Probe, ScheduledCheck};
use crate::health::{CheckKey, HealthReport};
use crate::metrics::MetricsCollector;
use crate::sink::ReportSink;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Registry of periodic health checks, keyed by (kind, property).
///
/// Cloning is cheap and every clone shares the same checks. When the last
/// clone is dropped all remaining checks are stopped.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<MonitorInner>,
}

pub(crate) struct MonitorInner {
    source_id: Arc<str>,
    sink: Arc<dyn ReportSink>,
    metrics: Option<Arc<MetricsCollector>>,
    checks: DashMap<CheckKey, Arc<ScheduledCheck>>,
}

impl HealthMonitor {
    pub fn new(source_id: impl Into<String>, sink: Arc<dyn ReportSink>) -> Self {
        Self::with_metrics(source_id, sink, None)
    }

    pub fn with_metrics(
        source_id: impl Into<String>,
        sink: Arc<dyn ReportSink>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let source_id: String = source_id.into();

        Self {
            inner: Arc::new(MonitorInner {
                source_id: Arc::from(source_id),
                sink,
                metrics,
                checks: DashMap::new(),
            }),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.inner.source_id
    }

    /// Registers a check and arms its timer; the first execution happens one
    /// `frequency` from now.
    ///
    /// The kind is taken from the report type the probe returns. Must be
    /// called from within a Tokio runtime.
    pub fn add<R, F, Fut>(
        &self,
        frequency: Duration,
        property: impl Into<String>,
        probe: F,
    ) -> Result<CheckKey, MonitorError>
    where
        R: EntityReport,
        F: Fn(CheckContext<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.add_probe(frequency, property, Probe::new(probe))
    }

    /// Same as [`add`](Self::add) for an already wrapped [`Probe`].
    pub fn add_probe(
        &self,
        frequency: Duration,
        property: impl Into<String>,
        probe: Probe,
    ) -> Result<CheckKey, MonitorError> {
        let key = CheckKey::new(probe.kind(), property);

        if frequency.is_zero() {
            return Err(MonitorError::InvalidFrequency { key });
        }

        let check = match self.inner.checks.entry(key.clone()) {
            Entry::Occupied(_) => {
                warn!(check = %key, "health check already registered");
                return Err(MonitorError::DuplicateRegistration {
                    kind: key.kind,
                    property: key.property,
                });
            }
            Entry::Vacant(entry) => {
                let check = Arc::new(ScheduledCheck::new(
                    key.clone(),
                    Arc::clone(&self.inner.source_id),
                    frequency,
                    probe,
                    Arc::downgrade(&self.inner),
                ));
                entry.insert(Arc::clone(&check));
                check
            }
        };

        // Started only once the entry is visible, and outside the shard lock.
        check.start();
        self.inner.update_registered_checks();

        info!(check = %key, ?frequency, "health check registered");
        Ok(key)
    }

    /// Stops and unregisters a check. Returns `false` if it was not registered.
    ///
    /// An execution already in flight is not cancelled; the report it produces
    /// is dropped.
    pub fn remove(&self, key: &CheckKey) -> bool {
        match self.inner.checks.remove(key) {
            Some((_, check)) => {
                check.stop();
                self.inner.update_registered_checks();
                info!(check = %key, executions = check.executions(), "health check removed");
                true
            }
            None => {
                debug!(check = %key, "remove ignored, health check not registered");
                false
            }
        }
    }

    /// Removes every registered check. Returns how many were removed.
    pub fn remove_all(&self) -> usize {
        self.checks()
            .into_iter()
            .filter(|(key, _)| self.remove(key))
            .count()
    }

    /// Forwards a report to the sink. Sink errors are logged, never returned.
    pub async fn report(&self, report: HealthReport) {
        self.inner.submit(report).await;
    }

    /// Snapshot of the registered checks; safe to iterate while removing.
    pub fn checks(&self) -> Vec<(CheckKey, Arc<ScheduledCheck>)> {
        self.inner
            .checks
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn get(&self, key: &CheckKey) -> Option<Arc<ScheduledCheck>> {
        self.inner.checks.get(key).map(|c| c.clone())
    }

    pub fn contains(&self, key: &CheckKey) -> bool {
        self.inner.checks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.checks.is_empty()
    }
}

impl MonitorInner {
    /// Removes `check`'s entry, but only if the entry is still that check.
    pub(crate) fn unregister(&self, check: &ScheduledCheck) {
        let removed = self
            .checks
            .remove_if(check.key(), |_, registered| std::ptr::eq(registered.as_ref(), check))
            .is_some();

        if removed {
            self.update_registered_checks();
            info!(check = %check.key(), executions = check.executions(), "health check removed");
        }
    }

    /// Hands a report from a finished execution to the sink, unless the check
    /// was removed while the execution was in flight.
    pub(crate) async fn deliver(&self, check: &ScheduledCheck, report: HealthReport) {
        let registered = self
            .checks
            .get(check.key())
            .map(|entry| std::ptr::eq(entry.value().as_ref(), check))
            .unwrap_or(false);

        if !registered || check.state() == CheckState::Removed {
            debug!(check = %check.key(), "check no longer registered, dropping report");
            if let Some(metrics) = &self.metrics {
                metrics.record_dropped_report();
            }
            return;
        }

        self.submit(report).await;
    }

    async fn submit(&self, report: HealthReport) {
        let kind = report.kind();
        let state = report.health_state();

        match self.sink.submit(&self.source_id, report).await {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_report(kind, state);
                }
            }
            Err(e) => {
                warn!(error = %e, %kind, health_state = %state, "failed to submit health report");
                if let Some(metrics) = &self.metrics {
                    metrics.record_sink_failure();
                }
            }
        }
    }

    pub(crate) fn record_execution(&self, key: &CheckKey, success: bool, duration: Duration) {
        if let Some(metrics) = &self.metrics {
            metrics.record_execution(key, success, duration);
        }
    }

    fn update_registered_checks(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.update_registered_checks(self.checks.len());
        }
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        for entry in self.checks.iter() {
            entry.value().stop();
        }
    }
}
