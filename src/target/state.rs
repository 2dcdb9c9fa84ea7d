// src/target/state.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub type CrashHook = Arc<dyn Fn() + Send + Sync>;

const NODE_ENV_VAR: &str = "HostedServiceName";
const NOT_ON_FABRIC: &str = "Not running on Service Fabric";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCommand {
    Delay(u64),
    Crash,
    Unknown(String),
}

impl TargetCommand {
    /// Reads `cmd` (and `delay`) from a query string. `None` when no command
    /// was given.
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        ReceivedCommand::from_query(query).map(|received| received.command)
    }
}

/// A command as it arrived: the `cmd` value verbatim plus its meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedCommand {
    pub raw: String,
    pub command: TargetCommand,
}

impl ReceivedCommand {
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        let query = query?;
        let mut raw = None;
        let mut delay = None;

        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "cmd" => raw = Some(value.into_owned()),
                "delay" => delay = Some(value.into_owned()),
                _ => {}
            }
        }

        let raw = raw.filter(|c| !c.is_empty())?;
        let command = match raw.to_lowercase().as_str() {
            // An unparsable delay resets it to zero.
            "delay" => TargetCommand::Delay(
                delay.and_then(|d| d.trim().parse().ok()).unwrap_or(0),
            ),
            "crash" => TargetCommand::Crash,
            _ => TargetCommand::Unknown(raw.clone()),
        };

        Some(Self { raw, command })
    }
}

/// Shared state of the crashable target.
#[derive(Clone)]
pub struct TargetState {
    node: String,
    delay_secs: Arc<AtomicU64>,
    crash_hook: CrashHook,
}

impl TargetState {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            delay_secs: Arc::new(AtomicU64::new(0)),
            crash_hook: Arc::new(|| {
                warn!("crash requested, exiting");
                std::process::exit(-1);
            }),
        }
    }

    /// Node name from `HostedServiceName`, as set by the hosting cluster.
    pub fn from_env() -> Self {
        let node = std::env::var(NODE_ENV_VAR).unwrap_or_else(|_| NOT_ON_FABRIC.to_string());
        Self::new(node)
    }

    /// Replaces the default crash behaviour (process exit).
    pub fn with_crash_hook(mut self, hook: CrashHook) -> Self {
        self.crash_hook = hook;
        self
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs.load(Ordering::SeqCst))
    }

    pub fn apply(&self, command: &TargetCommand) {
        match command {
            TargetCommand::Delay(secs) => {
                self.delay_secs.store(*secs, Ordering::SeqCst);
                info!(delay_secs = secs, "delay updated");
            }
            TargetCommand::Crash => (self.crash_hook)(),
            TargetCommand::Unknown(name) => {
                warn!(command = %name, "ignoring unknown command");
            }
        }
    }

    /// Applies the command, waits the current delay and renders the page.
    pub async fn process(&self, received: Option<ReceivedCommand>) -> String {
        if let Some(received) = &received {
            self.apply(&received.command);
        }

        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.render(received.as_ref().map(|r| r.raw.as_str()))
    }

    fn render(&self, command: Option<&str>) -> String {
        format!(
            "<HTML><BODY><strong>Node:</strong> {} - <strong>Delay:</strong> {} - <strong>Date:</strong> {} - <strong>Command:</strong> {}</BODY></HTML>",
            self.node,
            self.delay().as_secs(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            command.unwrap_or(""),
        )
    }
}
