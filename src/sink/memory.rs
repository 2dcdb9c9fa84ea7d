// src/sink/memory.rs
use super::{ReportSink, SinkError};
use crate::health::HealthReport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Keeps every submitted report in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<(String, HealthReport)>>,
    failing: AtomicBool,
    rejected: AtomicU64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every submission fails with [`SinkError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reports(&self) -> Vec<HealthReport> {
        self.lock().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn submissions(&self) -> Vec<(String, HealthReport)> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of submissions refused while failing.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, HealthReport)>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.reports.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn submit(&self, source_id: &str, report: HealthReport) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(SinkError::Unavailable("memory sink set to fail".to_string()));
        }

        self.lock().push((source_id.to_string(), report));
        Ok(())
    }
}
