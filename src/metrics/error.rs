//! Error types for the metrics system

use std::fmt;
use thiserror::Error;

/// Errors raised by metrics operations
#[derive(Error, Debug, Clone)]
pub enum MetricsError {
    /// Invalid metric name (empty, invalid characters, wrong format)
    #[error("Invalid metric name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Invalid label name or value
    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    /// Metric creation or registration failed
    #[error("Failed to register metric '{name}': {reason}")]
    RegistrationFailed { name: String, reason: String },

    /// Metric export failed
    #[error("Failed to export metrics: {reason}")]
    ExportFailed { reason: String },

    /// Value is NaN, infinite or too large
    #[error("Invalid value '{value}': {reason}")]
    InvalidValue { value: String, reason: String },

    /// Bad exporter configuration
    #[error("Configuration error: {reason}")]
    ConfigurationError { reason: String },
}

impl MetricsError {
    pub fn invalid_name<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_label<L: Into<String>, R: Into<String>>(label: L, reason: R) -> Self {
        Self::InvalidLabel {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn registration_failed<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::RegistrationFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn export_failed<R: Into<String>>(reason: R) -> Self {
        Self::ExportFailed {
            reason: reason.into(),
        }
    }

    pub fn invalid_value<V: fmt::Display, R: Into<String>>(value: V, reason: R) -> Self {
        Self::InvalidValue {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn configuration_error<R: Into<String>>(reason: R) -> Self {
        Self::ConfigurationError {
            reason: reason.into(),
        }
    }
}

/// Validation of metric names, labels and values (Prometheus rules)
pub mod validation {
    use super::MetricsError;
    use std::collections::HashSet;

    const RESERVED_LABELS: &[&str] = &["__name__", "__value__"];
    const MAX_LABEL_VALUE_LENGTH: usize = 1024;
    const MAX_LABELS_PER_METRIC: usize = 16;

    /// Names must start with a letter or underscore and contain only
    /// letters, digits, underscores and colons.
    pub fn validate_metric_name(name: &str) -> Result<(), MetricsError> {
        let Some(first) = name.chars().next() else {
            return Err(MetricsError::invalid_name(name, "Metric name cannot be empty"));
        };

        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(MetricsError::invalid_name(
                name,
                "Metric name must start with a letter or underscore",
            ));
        }

        if let Some((i, ch)) = name
            .chars()
            .enumerate()
            .find(|(_, ch)| !ch.is_ascii_alphanumeric() && *ch != '_' && *ch != ':')
        {
            return Err(MetricsError::invalid_name(
                name,
                format!("Invalid character '{}' at position {}", ch, i),
            ));
        }

        Ok(())
    }

    pub fn validate_label_key(key: &str) -> Result<(), MetricsError> {
        let Some(first) = key.chars().next() else {
            return Err(MetricsError::invalid_label(key, "Label key cannot be empty"));
        };

        if RESERVED_LABELS.contains(&key) {
            return Err(MetricsError::invalid_label(key, "Label key is reserved by Prometheus"));
        }

        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(MetricsError::invalid_label(
                key,
                "Label key must start with a letter or underscore",
            ));
        }

        if key.chars().any(|ch| !ch.is_ascii_alphanumeric() && ch != '_') {
            return Err(MetricsError::invalid_label(key, "Label key contains invalid characters"));
        }

        Ok(())
    }

    pub fn validate_label_value(value: &str) -> Result<(), MetricsError> {
        if value.len() > MAX_LABEL_VALUE_LENGTH {
            return Err(MetricsError::invalid_label(
                value,
                format!("Label value too long (max {} characters)", MAX_LABEL_VALUE_LENGTH),
            ));
        }

        if value.chars().any(|ch| ch.is_control()) {
            return Err(MetricsError::invalid_label(value, "Label value contains control characters"));
        }

        Ok(())
    }

    pub fn validate_labels(labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        if labels.len() > MAX_LABELS_PER_METRIC {
            return Err(MetricsError::invalid_label(
                "",
                format!("Too many labels (max {} allowed)", MAX_LABELS_PER_METRIC),
            ));
        }

        let mut seen = HashSet::new();
        for (key, value) in labels {
            validate_label_key(key)?;
            validate_label_value(value)?;
            if !seen.insert(*key) {
                return Err(MetricsError::invalid_label(*key, "Duplicate label key"));
            }
        }

        Ok(())
    }

    pub fn validate_numeric_value(value: f64) -> Result<(), MetricsError> {
        if !value.is_finite() {
            return Err(MetricsError::invalid_value(
                value,
                "Value must be finite (not NaN or infinite)",
            ));
        }

        if value.abs() > (1u64 << 53) as f64 {
            return Err(MetricsError::invalid_value(
                value,
                "Value too large, may lose precision in f64",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::MetricsError;

    #[test]
    fn test_metric_names() {
        assert!(validate_metric_name("http_requests_total").is_ok());
        assert!(validate_metric_name("_private:sub").is_ok());
        assert!(matches!(validate_metric_name(""), Err(MetricsError::InvalidName { .. })));
        assert!(validate_metric_name("1abc").is_err());
        assert!(validate_metric_name("has-dash").is_err());
    }

    #[test]
    fn test_labels() {
        assert!(validate_labels(&[("endpoint", "/get_title"), ("status", "200")]).is_ok());
        assert!(validate_labels(&[("__name__", "x")]).is_err());
        assert!(validate_labels(&[("a", "1"), ("a", "2")]).is_err());
        assert!(validate_labels(&[("ok", "line\nbreak")]).is_err());
    }

    #[test]
    fn test_numeric_values() {
        assert!(validate_numeric_value(0.25).is_ok());
        assert!(validate_numeric_value(f64::NAN).is_err());
        assert!(validate_numeric_value(f64::INFINITY).is_err());
        assert!(validate_numeric_value(1e18).is_err());
    }
}
