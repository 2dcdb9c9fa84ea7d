// src/metrics/collector.rs
use crate::health::{CheckKey, HealthReportKind, HealthState};
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Text exposition of everything registered.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Check metrics
    pub check_executions_total: IntCounterVec,
    pub check_duration_seconds: HistogramVec,
    pub registered_checks: IntGauge,

    // Report metrics
    pub reports_total: IntCounterVec,
    pub reports_dropped_total: IntCounter,
    pub sink_failures_total: IntCounter,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        // Check metrics
        let check_executions_total = IntCounterVec::new(
            Opts::new("hm_check_executions_total", "Total health check executions"),
            &["kind", "property", "outcome"],
        )?;
        registry.register(Box::new(check_executions_total.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "hm_check_duration_seconds",
                "Health check execution duration in seconds",
            ),
            &["kind", "property"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let registered_checks =
            IntGauge::new("hm_registered_checks", "Number of registered health checks")?;
        registry.register(Box::new(registered_checks.clone()))?;

        // Report metrics
        let reports_total = IntCounterVec::new(
            Opts::new("hm_reports_total", "Health reports delivered to the sink"),
            &["kind", "health_state"],
        )?;
        registry.register(Box::new(reports_total.clone()))?;

        let reports_dropped_total = IntCounter::new(
            "hm_reports_dropped_total",
            "Reports dropped because their check was removed while running",
        )?;
        registry.register(Box::new(reports_dropped_total.clone()))?;

        let sink_failures_total =
            IntCounter::new("hm_sink_failures_total", "Failed report submissions")?;
        registry.register(Box::new(sink_failures_total.clone()))?;

        Ok(Self {
            check_executions_total,
            check_duration_seconds,
            registered_checks,
            reports_total,
            reports_dropped_total,
            sink_failures_total,
        })
    }

    pub fn record_execution(&self, key: &CheckKey, success: bool, duration: Duration) {
        let kind = key.kind.as_str();
        let outcome = if success { "success" } else { "failure" };
        self.check_executions_total
            .with_label_values(&[kind, key.property.as_str(), outcome])
            .inc();

        self.check_duration_seconds
            .with_label_values(&[kind, key.property.as_str()])
            .observe(duration.as_secs_f64());
    }

    pub fn record_report(&self, kind: HealthReportKind, state: HealthState) {
        self.reports_total
            .with_label_values(&[kind.as_str(), state.as_str()])
            .inc();
    }

    pub fn record_dropped_report(&self) {
        self.reports_dropped_total.inc();
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures_total.inc();
    }

    pub fn update_registered_checks(&self, count: usize) {
        self.registered_checks.set(count as i64);
    }
}
