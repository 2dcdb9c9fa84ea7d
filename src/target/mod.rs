//! The crashable web service a monitor probes.
//!
//! Every request waits the configured delay and then returns a small status
//! page. Two query commands change its behaviour:
//!
//! - `?cmd=delay&delay=<seconds>` sets the artificial delay
//! - `?cmd=crash` terminates the process

mod client;
mod handler;
mod state;

pub use client::TargetClient;
pub use handler::TargetHandler;
pub use state::{CrashHook, ReceivedCommand, TargetCommand, TargetState};
