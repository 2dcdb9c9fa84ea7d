// src/config/models.rs
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const CRASHABLE_APP_NAME: &str = "BasicAvailabilityApp";
pub const CRASHABLE_SERVICE_NAME: &str = "CrashableService";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Defaults to the executable's file stem.
    pub source_id: Option<String>,
    pub startup_delay_secs: u64,
    pub target: TargetConfig,
    pub performance_check: PerformanceCheckConfig,
    pub metrics: MetricsConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source_id: None,
            startup_delay_secs: 5,
            target: TargetConfig::default(),
            performance_check: PerformanceCheckConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(source_id) = &self.source_id {
            if source_id.trim().is_empty() {
                bail!("source_id must not be empty");
            }
        }

        self.target.validate()?;
        self.performance_check.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

impl TargetConfig {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&format!("http://{}:{}/", self.host, self.port))
            .with_context(|| format!("Invalid target address {}:{}", self.host, self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("target.port must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("target.request_timeout_secs must be greater than zero");
        }
        self.base_url()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceCheckConfig {
    pub property: String,
    pub frequency_secs: u64,
    pub warning_threshold_ms: u64,
    pub time_to_live_secs: u64,
    pub service_name: String,
}

impl Default for PerformanceCheckConfig {
    fn default() -> Self {
        Self {
            property: "PerformanceCheck".to_string(),
            frequency_secs: 10,
            warning_threshold_ms: 1000,
            time_to_live_secs: 15,
            service_name: format!("fabric:/{}/{}", CRASHABLE_APP_NAME, CRASHABLE_SERVICE_NAME),
        }
    }
}

impl PerformanceCheckConfig {
    pub fn frequency(&self) -> Duration {
        Duration::from_secs(self.frequency_secs)
    }

    pub fn warning_threshold(&self) -> Duration {
        Duration::from_millis(self.warning_threshold_ms)
    }

    pub fn time_to_live(&self) -> Duration {
        Duration::from_secs(self.time_to_live_secs)
    }

    pub fn service_name(&self) -> Result<Url> {
        Url::parse(&self.service_name)
            .with_context(|| format!("Invalid service name {}", self.service_name))
    }

    fn validate(&self) -> Result<()> {
        if self.property.trim().is_empty() {
            bail!("performance_check.property must not be empty");
        }
        if self.frequency_secs == 0 {
            bail!("performance_check.frequency_secs must be greater than zero");
        }
        if self.warning_threshold_ms == 0 {
            bail!("performance_check.warning_threshold_ms must be greater than zero");
        }
        if self.time_to_live_secs == 0 {
            bail!("performance_check.time_to_live_secs must be greater than zero");
        }
        self.service_name()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<()> {
        if self.enabled && !self.path.starts_with('/') {
            bail!("metrics.path must start with '/'");
        }
        Ok(())
    }
}
