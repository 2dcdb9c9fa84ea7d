pub mod builder;
pub mod metrics;

pub use builder::ServerBuilder;
pub use metrics::MetricsHandler;
