//! Metrics facade for the gateway
//!
//! A pluggable exporter sits behind a cheap-to-clone `Metrics` handle. The
//! convenience recorders never fail: recording errors are logged and dropped
//! so that observability can never break a request or the keep-alive loop.
//!
//! ```rust,no_run
//! use yt_gateway::metrics::{create_prometheus_exporter, Metrics};
//!
//! # async fn example() {
//! let metrics = Metrics::new(create_prometheus_exporter());
//! metrics.record_http_request("/get_title", "GET", "200", 0.042).await;
//! let text = metrics.export().await.unwrap();
//! # }
//! ```

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

use crate::metrics::error::MetricsError;
use crate::metrics::null::NullExporter;
use crate::metrics::prometheus::PrometheusExporter;

/// Interface every metrics backend implements
#[async_trait]
pub trait MetricsExporter: Send + Sync {
    /// Increment a counter by 1
    async fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError>;

    /// Record one observation in a histogram
    async fn observe_histogram(
        &self,
        name: &str,
        value: f64,
        labels: &[(&str, &str)],
    ) -> Result<(), MetricsError>;

    /// Serialize the current state in the backend's exposition format
    async fn export(&self) -> Result<Vec<u8>, MetricsError>;
}

/// Metrics handle shared by handlers, middleware and the keep-alive task
#[derive(Clone)]
pub struct Metrics {
    exporter: Arc<dyn MetricsExporter>,
}

impl Metrics {
    pub fn new(exporter: Arc<dyn MetricsExporter>) -> Self {
        Self { exporter }
    }

    pub async fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        self.exporter.increment(name, labels).await
    }

    pub async fn observe_histogram(
        &self,
        name: &str,
        value: f64,
        labels: &[(&str, &str)],
    ) -> Result<(), MetricsError> {
        self.exporter.observe_histogram(name, value, labels).await
    }

    pub async fn export(&self) -> Result<Vec<u8>, MetricsError> {
        self.exporter.export().await
    }

    /// Record one served HTTP request
    pub async fn record_http_request(&self, endpoint: &str, method: &str, status: &str, duration: f64) {
        let labels = [("endpoint", endpoint), ("method", method), ("status", status)];
        self.observe_quietly("http_request_duration_seconds", duration, &labels)
            .await;
        self.increment_quietly("http_requests_total", &labels).await;
    }

    /// Record the outcome of an API key check ("success" or "failure")
    pub async fn record_auth_attempt(&self, status: &str) {
        self.increment_quietly("auth_attempts_total", &[("status", status)])
            .await;
    }

    /// Record the outcome of a keep-alive ping ("success" or "failure")
    pub async fn record_keep_alive_ping(&self, outcome: &str) {
        self.increment_quietly("keep_alive_pings_total", &[("outcome", outcome)])
            .await;
    }

    /// Record one upstream adapter call
    pub async fn record_upstream_call(&self, provider: &str, outcome: &str) {
        self.increment_quietly(
            "upstream_calls_total",
            &[("provider", provider), ("outcome", outcome)],
        )
        .await;
    }

    async fn increment_quietly(&self, name: &str, labels: &[(&str, &str)]) {
        if let Err(e) = self.exporter.increment(name, labels).await {
            warn!("Failed to increment counter '{}': {}", name, e);
        }
    }

    async fn observe_quietly(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        if let Err(e) = self.exporter.observe_histogram(name, value, labels).await {
            warn!("Failed to observe histogram '{}': {}", name, e);
        }
    }
}

/// Build an exporter from the configured backend name
pub fn create_metrics_exporter(
    backend: &str,
    namespace: Option<&str>,
) -> Result<Arc<dyn MetricsExporter>, MetricsError> {
    match backend.to_lowercase().as_str() {
        "prometheus" => {
            debug!("Initializing Prometheus metrics exporter");
            let exporter = match namespace {
                Some(ns) => PrometheusExporter::with_namespace(ns)?,
                None => PrometheusExporter::new(),
            };
            Ok(Arc::new(exporter))
        }
        "none" | "null" | "disabled" => {
            debug!("Metrics disabled, using null exporter");
            Ok(Arc::new(NullExporter))
        }
        other => Err(MetricsError::configuration_error(format!(
            "Unknown metrics backend '{}'",
            other
        ))),
    }
}

pub fn create_prometheus_exporter() -> Arc<dyn MetricsExporter> {
    Arc::new(PrometheusExporter::new())
}

pub fn create_null_exporter() -> Arc<dyn MetricsExporter> {
    Arc::new(NullExporter)
}
