// Prometheus metrics exporter
//
// Metric families are created lazily on first use and registered in a private
// registry. Label names are sorted so that the same label set always maps to
// the same family regardless of call-site ordering.

use crate::metrics::error::{validation, MetricsError};
use crate::metrics::metrics::MetricsExporter;
use async_trait::async_trait;
use log::debug;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Buckets for latency histograms, in seconds
const DURATION_BUCKETS: [f64; 12] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Prometheus implementation of MetricsExporter
pub struct PrometheusExporter {
    registry: Registry,
    counters: Mutex<HashMap<String, CounterVec>>,
    histograms: Mutex<HashMap<String, HistogramVec>>,
    namespace: Option<String>,
}

impl Default for PrometheusExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusExporter {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
            namespace: None,
        }
    }

    /// Prefix every metric name with `<namespace>_`
    pub fn with_namespace<S: Into<String>>(namespace: S) -> Result<Self, MetricsError> {
        let namespace = namespace.into();
        validation::validate_metric_name(&namespace).map_err(|e| {
            MetricsError::configuration_error(format!("Invalid namespace '{}': {}", namespace, e))
        })?;

        Ok(Self {
            namespace: Some(namespace),
            ..Self::new()
        })
    }

    fn apply_namespace(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}_{}", ns, name),
            None => name.to_string(),
        }
    }

    /// "http_requests_total" -> "Http Requests Total"
    fn help_text(name: &str, kind: &str) -> String {
        let readable = name
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} - {}", readable, kind)
    }

    /// Sorted label names with the values reordered to match
    fn split_labels<'a>(labels: &[(&'a str, &'a str)]) -> (Vec<&'a str>, Vec<&'a str>) {
        let mut sorted = labels.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted.into_iter().unzip()
    }

    async fn counter(&self, name: &str, label_names: &[&str]) -> Result<CounterVec, MetricsError> {
        let full_name = self.apply_namespace(name);
        let mut counters = self.counters.lock().await;
        if let Some(counter) = counters.get(&full_name) {
            return Ok(counter.clone());
        }

        let opts = Opts::new(&full_name, Self::help_text(name, "counter"));
        let counter = CounterVec::new(opts, label_names)
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;
        self.registry
            .register(Box::new(counter.clone()))
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;

        counters.insert(full_name, counter.clone());
        Ok(counter)
    }

    async fn histogram(&self, name: &str, label_names: &[&str]) -> Result<HistogramVec, MetricsError> {
        let full_name = self.apply_namespace(name);
        let mut histograms = self.histograms.lock().await;
        if let Some(histogram) = histograms.get(&full_name) {
            return Ok(histogram.clone());
        }

        let opts = HistogramOpts::new(&full_name, Self::help_text(name, "histogram"))
            .buckets(DURATION_BUCKETS.to_vec());
        let histogram = HistogramVec::new(opts, label_names)
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;
        self.registry
            .register(Box::new(histogram.clone()))
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;

        histograms.insert(full_name, histogram.clone());
        Ok(histogram)
    }
}

#[async_trait]
impl MetricsExporter for PrometheusExporter {
    async fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        validation::validate_metric_name(name)?;
        validation::validate_labels(labels)?;

        let (names, values) = Self::split_labels(labels);
        let counter = self.counter(name, &names).await?;
        counter
            .get_metric_with_label_values(&values)
            .map_err(|e| MetricsError::invalid_label(name, e.to_string()))?
            .inc();

        debug!("Incremented counter {} with labels {:?}", name, labels);
        Ok(())
    }

    async fn observe_histogram(
        &self,
        name: &str,
        value: f64,
        labels: &[(&str, &str)],
    ) -> Result<(), MetricsError> {
        validation::validate_metric_name(name)?;
        validation::validate_labels(labels)?;
        validation::validate_numeric_value(value)?;

        let (names, values) = Self::split_labels(labels);
        let histogram = self.histogram(name, &names).await?;
        histogram
            .get_metric_with_label_values(&values)
            .map_err(|e| MetricsError::invalid_label(name, e.to_string()))?
            .observe(value);

        debug!("Observed histogram {} = {} with labels {:?}", name, value, labels);
        Ok(())
    }

    async fn export(&self) -> Result<Vec<u8>, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::export_failed(format!("Failed to encode metrics: {}", e)))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_text() {
        assert_eq!(
            PrometheusExporter::help_text("http_requests_total", "counter"),
            "Http Requests Total - counter"
        );
    }

    #[test]
    fn test_split_labels_sorts_by_name() {
        let (names, values) =
            PrometheusExporter::split_labels(&[("status", "200"), ("endpoint", "/health")]);
        assert_eq!(names, vec!["endpoint", "status"]);
        assert_eq!(values, vec!["/health", "200"]);
    }

    #[test]
    fn test_invalid_namespace() {
        assert!(PrometheusExporter::with_namespace("bad-name").is_err());
        assert!(PrometheusExporter::with_namespace("yt_gateway").is_ok());
    }
}
