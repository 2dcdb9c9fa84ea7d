// src/monitor/check.rs
use super::registry::MonitorInner;
use super::{MonitorError, Probe};
use crate::health::{CheckKey, HealthReportKind};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Idle,     // Timer armed, waiting for the next fire
    Running,  // Probe in flight
    Removed,  // Terminal; no further fires
}

impl CheckState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CheckState::Idle,
            1 => CheckState::Running,
            _ => CheckState::Removed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            CheckState::Idle => 0,
            CheckState::Running => 1,
            CheckState::Removed => 2,
        }
    }
}

/// One registered health check and its self-rearming timer.
///
/// Created and started only by [`HealthMonitor`](super::HealthMonitor).
pub struct ScheduledCheck {
    key: CheckKey,
    source_id: Arc<str>,
    probe: Probe,
    frequency_nanos: AtomicU64,
    state: AtomicU8,
    executions: AtomicU64,
    monitor: Weak<MonitorInner>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledCheck {
    pub(crate) fn new(
        key: CheckKey,
        source_id: Arc<str>,
        frequency: Duration,
        probe: Probe,
        monitor: Weak<MonitorInner>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            key,
            source_id,
            probe,
            frequency_nanos: AtomicU64::new(to_nanos(frequency)),
            state: AtomicU8::new(CheckState::Idle.as_u8()),
            executions: AtomicU64::new(0),
            monitor,
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &CheckKey {
        &self.key
    }

    pub fn kind(&self) -> HealthReportKind {
        self.key.kind
    }

    pub fn property(&self) -> &str {
        &self.key.property
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn frequency(&self) -> Duration {
        Duration::from_nanos(self.frequency_nanos.load(Ordering::Relaxed))
    }

    /// Changes the interval. Applies from the next rearm; a fire that is
    /// already scheduled keeps its deadline.
    pub fn set_frequency(&self, frequency: Duration) -> Result<(), MonitorError> {
        if frequency.is_zero() {
            return Err(MonitorError::InvalidFrequency {
                key: self.key.clone(),
            });
        }

        self.frequency_nanos
            .store(to_nanos(frequency), Ordering::Relaxed);
        debug!(check = %self.key, ?frequency, "check frequency updated");
        Ok(())
    }

    pub fn state(&self) -> CheckState {
        CheckState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of executions started so far.
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::SeqCst)
    }

    /// Stops the timer and unregisters this check from its monitor.
    ///
    /// An execution already in flight is allowed to finish; its report is
    /// dropped. Calling this more than once is a no-op.
    pub fn remove(&self) {
        self.stop();

        if let Some(monitor) = self.monitor.upgrade() {
            monitor.unregister(self);
        }
    }

    /// Arms the timer. The monitor calls this once, after insertion.
    pub(crate) fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());

        if task.is_some() {
            warn!(check = %self.key, "check already started");
            return;
        }

        // Subscribed before the state check so a later stop() is always seen.
        let shutdown_rx = self.shutdown_tx.subscribe();

        if self.state() == CheckState::Removed {
            debug!(check = %self.key, "check removed before start");
            return;
        }

        let check = Arc::clone(self);
        *task = Some(tokio::spawn(check.run(shutdown_rx)));
    }

    /// Moves to `Removed` and cancels the pending fire, if any.
    ///
    /// Holds the task lock so it cannot interleave with [`start`](Self::start).
    pub(crate) fn stop(&self) {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        let previous = CheckState::from_u8(
            self.state.swap(CheckState::Removed.as_u8(), Ordering::SeqCst),
        );

        if previous == CheckState::Removed {
            return;
        }

        self.shutdown_tx.send_replace(true);

        match previous {
            CheckState::Running => {
                debug!(check = %self.key, "check removed while an execution is in flight");
            }
            _ => {
                // Idle means the task is parked in its sleep; no probe to lose.
                if let Some(task) = task.as_ref() {
                    task.abort();
                }
                debug!(check = %self.key, "check timer cancelled");
            }
        }
    }

    fn transition(&self, from: CheckState, to: CheckState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        debug!(check = %self.key, frequency = ?self.frequency(), "check timer armed");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.frequency()) => {}
                _ = shutdown_rx.changed() => {
                    break;
                }
            }

            if !self.transition(CheckState::Idle, CheckState::Running) {
                break;
            }

            self.execute().await;

            if !self.transition(CheckState::Running, CheckState::Idle) {
                break;
            }
        }

        debug!(check = %self.key, executions = self.executions(), "check timer stopped");
    }

    async fn execute(self: &Arc<Self>) {
        let execution = self.executions.fetch_add(1, Ordering::SeqCst) + 1;
        let span = info_span!(
            "health_check",
            check = %self.key,
            execution,
            execution_id = %Uuid::new_v4()
        );

        async {
            let started = Instant::now();

            // The probe runs in its own task so a panic is contained there.
            let check = Arc::clone(self);
            let probe = tokio::spawn(
                async move { check.probe.execute(Arc::clone(&check)).await }
                    .instrument(span.clone()),
            );
            let result = probe.await;
            let elapsed = started.elapsed();

            let Some(monitor) = self.monitor.upgrade() else {
                debug!("monitor dropped during execution");
                return;
            };

            match result {
                Ok(Ok(report)) => {
                    debug!(health_state = %report.health_state(), ?elapsed, "health check completed");
                    monitor.record_execution(&self.key, true, elapsed);
                    monitor.deliver(self, report).await;
                }
                Ok(Err(e)) => {
                    error!(error = %e, ?elapsed, "health check failed");
                    monitor.record_execution(&self.key, false, elapsed);
                }
                Err(e) => {
                    error!(error = %e, panicked = e.is_panic(), ?elapsed, "health check task failed");
                    monitor.record_execution(&self.key, false, elapsed);
                }
            }
        }
        .instrument(span.clone())
        .await
    }
}

impl fmt::Debug for ScheduledCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledCheck")
            .field("key", &self.key)
            .field("frequency", &self.frequency())
            .field("state", &self.state())
            .field("executions", &self.executions())
            .finish()
    }
}

fn to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
