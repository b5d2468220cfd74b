//! Integration tests for the metrics system
//!
//! These tests exercise the facade against both backends and check that
//! invalid input is reported by the exporter but swallowed by the recorders.

use crate::metrics::{
    create_metrics_exporter, create_null_exporter, create_prometheus_exporter, MetricsError,
    Metrics,
};

#[tokio::test]
async fn test_prometheus_metrics_basic_operations() {
    let metrics = Metrics::new(create_prometheus_exporter());

    metrics
        .increment("test_counter", &[("label", "value")])
        .await
        .expect("Failed to increment counter");

    metrics
        .observe_histogram("test_histogram", 1.23, &[("type", "test")])
        .await
        .expect("Failed to observe histogram");

    let exported = metrics.export().await.expect("Failed to export metrics");
    let exported_str = String::from_utf8(exported).expect("Invalid UTF-8 in exported metrics");

    assert!(exported_str.contains("test_counter"));
    assert!(exported_str.contains("test_histogram"));
}

#[tokio::test]
async fn test_null_exporter_never_fails() {
    let metrics = Metrics::new(create_null_exporter());

    let _ = metrics.increment("any_name", &[]).await;
    let _ = metrics.observe_histogram("any_histogram", -1.0, &[]).await;

    let exported = metrics
        .export()
        .await
        .expect("Null exporter should never fail");
    assert_eq!(exported, b"");
}

#[tokio::test]
async fn test_metrics_validation_errors() {
    let exporter = create_prometheus_exporter();

    let result = exporter.increment("", &[]).await;
    assert!(matches!(result, Err(MetricsError::InvalidName { .. })));

    let result = exporter.observe_histogram("valid_name", f64::INFINITY, &[]).await;
    assert!(matches!(result, Err(MetricsError::InvalidValue { .. })));

    let result = exporter.increment("valid_name", &[("", "value")]).await;
    assert!(matches!(result, Err(MetricsError::InvalidLabel { .. })));
}

#[tokio::test]
async fn test_gateway_recorders() {
    let metrics = Metrics::new(create_prometheus_exporter());

    metrics.record_http_request("/get_title", "GET", "200", 0.12).await;
    metrics.record_http_request("/get_title", "GET", "404", 0.03).await;
    metrics.record_auth_attempt("failure").await;
    metrics.record_keep_alive_ping("success").await;
    metrics.record_upstream_call("youtube_data", "ok").await;

    let exported = String::from_utf8(metrics.export().await.unwrap()).unwrap();
    assert!(exported.contains("http_requests_total"));
    assert!(exported.contains("status=\"404\""));
    assert!(exported.contains("auth_attempts_total"));
    assert!(exported.contains("keep_alive_pings_total"));
    assert!(exported.contains("upstream_calls_total"));
}

#[tokio::test]
async fn test_label_order_does_not_split_families() {
    let metrics = Metrics::new(create_prometheus_exporter());

    metrics
        .increment("ordered_total", &[("a", "1"), ("b", "2")])
        .await
        .unwrap();
    metrics
        .increment("ordered_total", &[("b", "2"), ("a", "1")])
        .await
        .unwrap();

    let exported = String::from_utf8(metrics.export().await.unwrap()).unwrap();
    assert!(exported.contains("ordered_total{a=\"1\",b=\"2\"} 2"));
}

#[tokio::test]
async fn test_recorders_swallow_invalid_input() {
    let metrics = Metrics::new(create_prometheus_exporter());

    // control character in a label value is rejected by the exporter
    metrics
        .record_http_request("/bad\u{7}", "GET", "200", 0.1)
        .await;
    metrics
        .record_http_request("/get_title", "GET", "200", f64::NAN)
        .await;
}

#[test]
fn test_exporter_factory() {
    assert!(create_metrics_exporter("prometheus", None).is_ok());
    assert!(create_metrics_exporter("Prometheus", Some("yt_gateway")).is_ok());
    assert!(create_metrics_exporter("none", None).is_ok());
    assert!(matches!(
        create_metrics_exporter("statsd", None),
        Err(MetricsError::ConfigurationError { .. })
    ));
    assert!(create_metrics_exporter("prometheus", Some("bad name")).is_err());
}
