// src/health/status.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of a single probe execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Ok,
    Warning,
    Error,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Ok => "Ok",
            HealthState::Warning => "Warning",
            HealthState::Error => "Error",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
