// Gateway metrics
//
// Pluggable metrics exporters (Prometheus or no-op) behind a shared facade.

pub mod error;
#[allow(clippy::module_inception)]
pub mod metrics;
pub mod null;
pub mod prometheus;

#[cfg(test)]
mod tests;

pub use self::error::MetricsError;
pub use self::metrics::{
    create_metrics_exporter, create_null_exporter, create_prometheus_exporter, Metrics,
    MetricsExporter,
};
