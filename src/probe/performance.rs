// src/probe/performance.rs
use super::{HealthPolicy, LatencyThresholdPolicy, ProbeOutcome};
use crate::config::MonitorConfig;
use crate::health::{CheckKey, HealthState, ServiceHealthReport};
use crate::monitor::{CheckContext, HealthMonitor, MonitorError};
use anyhow::Result;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Measures how long the target takes to serve its status page.
pub struct PerformanceProbe {
    client: Client,
    url: Url,
    service_name: Url,
    time_to_live: Duration,
    policy: Arc<dyn HealthPolicy>,
}

impl PerformanceProbe {
    pub fn new(url: Url, service_name: Url, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            url,
            service_name,
            time_to_live: Duration::from_secs(15),
            policy: Arc::new(LatencyThresholdPolicy::default()),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let check = &config.performance_check;
        let probe = Self::new(
            config.target.base_url()?,
            check.service_name()?,
            config.target.request_timeout(),
        )?
        .with_time_to_live(check.time_to_live())
        .with_policy(Arc::new(LatencyThresholdPolicy::new(check.warning_threshold())));

        Ok(probe)
    }

    pub fn with_policy(mut self, policy: Arc<dyn HealthPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_time_to_live(mut self, time_to_live: Duration) -> Self {
        self.time_to_live = time_to_live;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Issues one GET and times it, including reading the body.
    pub async fn measure(&self) -> ProbeOutcome {
        let start = Instant::now();
        debug!(url = %self.url, "checking performance");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status());

        let result = match response {
            Ok(response) => response.text().await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => ProbeOutcome::Responded(start.elapsed()),
            Err(e) if e.is_timeout() => ProbeOutcome::Failed("request timeout".to_string()),
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        }
    }

    /// The probe callback registered with the monitor.
    pub async fn check(
        &self,
        ctx: CheckContext<ServiceHealthReport>,
    ) -> Result<ServiceHealthReport> {
        let outcome = self.measure().await;

        match &outcome {
            ProbeOutcome::Responded(elapsed) => {
                debug!(url = %self.url, ?elapsed, "target responded")
            }
            ProbeOutcome::Failed(reason) => {
                warn!(url = %self.url, %reason, "performance check failed")
            }
        }

        let state = self.policy.evaluate(&outcome);
        let information = ctx
            .health_information(state, self.time_to_live)
            .with_remove_when_expired(false)
            .with_description(describe(state));

        Ok(ServiceHealthReport::new(self.service_name.clone(), information))
    }

    /// Registers this probe as a Service-kind check.
    pub fn register(
        self: Arc<Self>,
        monitor: &HealthMonitor,
        frequency: Duration,
        property: impl Into<String>,
    ) -> Result<CheckKey, MonitorError> {
        monitor.add(
            frequency,
            property,
            move |ctx: CheckContext<ServiceHealthReport>| {
                let probe = Arc::clone(&self);
                async move { probe.check(ctx).await }
            },
        )
    }
}

fn describe(state: HealthState) -> &'static str {
    match state {
        HealthState::Ok => "Web server is responding well.",
        HealthState::Warning => "Web server is responding slowly.",
        HealthState::Error => "Web server is not responding.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        assert_eq!(describe(HealthState::Ok), "Web server is responding well.");
        assert_eq!(describe(HealthState::Warning), "Web server is responding slowly.");
        assert_eq!(describe(HealthState::Error), "Web server is not responding.");
    }

    #[tokio::test]
    async fn test_unreachable_target_fails() {
        let probe = PerformanceProbe::new(
            Url::parse("http://127.0.0.1:1/").unwrap(),
            Url::parse("fabric:/App/Svc").unwrap(),
            Duration::from_millis(500),
        )
        .unwrap();

        let outcome = probe.measure().await;
        assert!(matches!(outcome, ProbeOutcome::Failed(_)));
    }
}
