// src/target/client.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Sends control commands to a running crashable target.
#[derive(Debug, Clone)]
pub struct TargetClient {
    client: Client,
    base_url: Url,
}

impl TargetClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Fetches the status page without issuing a command.
    pub async fn status(&self) -> Result<String> {
        self.get(&[]).await
    }

    pub async fn set_delay(&self, secs: u64) -> Result<String> {
        let delay = secs.to_string();
        self.get(&[("cmd", "delay"), ("delay", delay.as_str())]).await
    }

    /// Asks the target to exit. The connection usually fails as a result,
    /// so errors are returned but expected.
    pub async fn crash(&self) -> Result<String> {
        self.get(&[("cmd", "crash")]).await
    }

    async fn get(&self, query: &[(&str, &str)]) -> Result<String> {
        let mut url = self.base_url.clone();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let body = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()?
            .text()
            .await?;

        Ok(body)
    }
}
