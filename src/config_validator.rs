// Configuration validation module for the gateway
//
// Validates every known environment variable before the server starts so that
// configuration mistakes surface at boot with clear messages instead of as
// odd runtime behavior.
//
// The validation system is schema-driven: `CONFIG_PARAMS` is the single
// registry of variable names, types, defaults and ranges.

use std::env;
use std::net::IpAddr;
use std::str::FromStr;

use actix_web::http::header::HeaderName;
use log::{error, info, warn};
use url::Url;

use crate::config::defaults;

/// Configuration parameter types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigType {
    String,
    Integer,
    UnsignedInteger,
    Boolean,
    IpAddress,
    Port,
    Url,
    HeaderName,
    Enum(&'static [&'static str]),
}

/// Validation severity levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must be valid for application to start
    Standard, // Important but application can start with defaults
    Warning,  // Optional, generates warnings only
}

/// Configuration parameter definition
#[derive(Debug, Clone)]
pub struct ConfigParam {
    pub name: &'static str,
    pub description: &'static str,
    pub param_type: ConfigType,
    pub default_value: Option<&'static str>,
    pub required: bool,
    pub validation_level: ValidationLevel,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
}

impl ConfigParam {
    const fn new(
        name: &'static str,
        description: &'static str,
        param_type: ConfigType,
        default_value: Option<&'static str>,
        validation_level: ValidationLevel,
    ) -> Self {
        Self {
            name,
            description,
            param_type,
            default_value,
            required: false,
            validation_level,
            min_value: None,
            max_value: None,
        }
    }

    const fn range(mut self, min: i64, max: i64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }
}

/// Centralized configuration parameter registry
pub const CONFIG_PARAMS: &[ConfigParam] = &[
    // Server Configuration
    ConfigParam::new(
        "GATEWAY_HOST",
        "Host IP address for the gateway",
        ConfigType::IpAddress,
        Some(defaults::HOST),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "PORT",
        "Port for the gateway",
        ConfigType::Port,
        Some("8000"),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "GATEWAY_TIMEOUT",
        "Client disconnect timeout in seconds",
        ConfigType::Integer,
        Some("60"),
        ValidationLevel::Standard,
    )
    .range(1, 3600),
    ConfigParam::new(
        "GATEWAY_KEEPALIVE",
        "HTTP connection keep-alive in seconds",
        ConfigType::Integer,
        Some("75"),
        ValidationLevel::Standard,
    )
    .range(1, 3600),
    ConfigParam::new(
        "HTTP_WORKER_NUMBER",
        "Number of HTTP workers (0 = actix default)",
        ConfigType::UnsignedInteger,
        Some("0"),
        ValidationLevel::Standard,
    )
    .range(0, 64),
    // Authentication
    ConfigParam::new(
        "API_KEY",
        "Secret expected in the API key header",
        ConfigType::String,
        Some(defaults::PLACEHOLDER_API_KEY),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "API_KEY_HEADER",
        "Header carrying the API key",
        ConfigType::HeaderName,
        Some(defaults::API_KEY_HEADER),
        ValidationLevel::Critical,
    ),
    // Upstream Configuration
    ConfigParam::new(
        "YOUTUBE_API_KEY",
        "YouTube Data API credential",
        ConfigType::String,
        Some(defaults::PLACEHOLDER_API_KEY),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "YOUTUBE_DATA_API_URL",
        "Base URL of the YouTube Data API",
        ConfigType::Url,
        Some(defaults::YOUTUBE_DATA_API_URL),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "UPSTREAM_TIMEOUT_SECONDS",
        "Timeout for one upstream call in seconds",
        ConfigType::Integer,
        Some("30"),
        ValidationLevel::Standard,
    )
    .range(1, 600),
    // Keep-Alive Configuration
    ConfigParam::new(
        "KEEP_ALIVE_ENABLED",
        "Start the self keep-alive task",
        ConfigType::Boolean,
        Some("true"),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "RENDER_EXTERNAL_URL",
        "Public base URL pinged by the keep-alive task",
        ConfigType::Url,
        None,
        ValidationLevel::Standard,
    ),
    // Out-of-range interval values are normalised at runtime, so only warn
    ConfigParam::new(
        "KEEP_ALIVE_MIN_INTERVAL_SECONDS",
        "Lower bound of the keep-alive interval",
        ConfigType::Integer,
        Some("420"),
        ValidationLevel::Warning,
    )
    .range(1, 86400),
    ConfigParam::new(
        "KEEP_ALIVE_MAX_INTERVAL_SECONDS",
        "Upper bound of the keep-alive interval",
        ConfigType::Integer,
        Some("720"),
        ValidationLevel::Warning,
    )
    .range(1, 86400),
    ConfigParam::new(
        "KEEP_ALIVE_FAILURE_BACKOFF_SECONDS",
        "Pause after a failed keep-alive ping",
        ConfigType::Integer,
        Some("300"),
        ValidationLevel::Warning,
    )
    .range(1, 86400),
    ConfigParam::new(
        "KEEP_ALIVE_PING_TIMEOUT_SECONDS",
        "Timeout for one keep-alive ping",
        ConfigType::Integer,
        Some("30"),
        ValidationLevel::Standard,
    )
    .range(1, 600),
    ConfigParam::new(
        "KEEP_ALIVE_SHUTDOWN_GRACE_SECONDS",
        "Bounded wait for the keep-alive task at shutdown",
        ConfigType::Integer,
        Some("10"),
        ValidationLevel::Standard,
    )
    .range(0, 300),
    // Metrics Configuration
    ConfigParam::new(
        "METRICS_BACKEND",
        "Metrics backend type",
        ConfigType::Enum(&["prometheus", "none", "null", "disabled"]),
        Some(defaults::METRICS_BACKEND),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "METRICS_NAMESPACE",
        "Prefix for all exported metrics",
        ConfigType::String,
        None,
        ValidationLevel::Warning,
    ),
];

/// Configuration validation errors with detailed context
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub value: String,
    pub error_type: ConfigErrorType,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErrorType {
    InvalidValue,
    InvalidFormat,
    InvalidRange,
    InsecureDefault,
    Required,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Configuration error in '{}' ({:?}): {} (value: '{}')",
            self.field, self.error_type, self.message, self.value
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " - Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result type for configuration validation
pub type ValidationResult<T> = Result<T, ConfigValidationError>;

/// Configuration validation results
#[derive(Debug)]
pub struct ValidationResults {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
    pub is_valid: bool,
}

impl ValidationResults {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }

    pub fn add_error(&mut self, error: ConfigValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ConfigValidationError) {
        self.warnings.push(warning);
    }

    fn add(&mut self, level: ValidationLevel, error: ConfigValidationError) {
        match level {
            ValidationLevel::Critical | ValidationLevel::Standard => self.add_error(error),
            ValidationLevel::Warning => self.add_warning(error),
        }
    }

    pub fn print_summary(&self) {
        if !self.errors.is_empty() {
            error!(
                "Configuration validation found {} error(s):",
                self.errors.len()
            );
            for (i, err) in self.errors.iter().enumerate() {
                error!("  {}. {}", i + 1, err);
            }
        }

        if !self.warnings.is_empty() {
            warn!(
                "Configuration validation found {} warning(s):",
                self.warnings.len()
            );
            for (i, warn) in self.warnings.iter().enumerate() {
                warn!("  {}. {}", i + 1, warn);
            }
        }

        if self.is_valid && self.warnings.is_empty() {
            info!("Configuration validation passed successfully");
        } else if self.is_valid {
            info!(
                "Configuration validation passed with {} warning(s)",
                self.warnings.len()
            );
        }
    }
}

/// Helper functions for common validation patterns
pub mod validators {
    use super::*;

    fn invalid(
        field: &str,
        value: &str,
        error_type: ConfigErrorType,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> ConfigValidationError {
        ConfigValidationError {
            field: field.to_string(),
            value: value.to_string(),
            error_type,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Validate boolean values from string
    pub fn validate_boolean(field: &str, value: &str) -> ValidationResult<bool> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidValue,
                "Invalid boolean value",
                "Use 'true' or 'false'",
            )),
        }
    }

    /// Validate integer values with optional range
    pub fn validate_integer(
        field: &str,
        value: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> ValidationResult<i64> {
        let parsed = value.parse::<i64>().map_err(|_| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid integer format",
                "Use a valid integer number",
            )
        })?;

        if let Some(min) = min {
            if parsed < min {
                return Err(invalid(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is below minimum {}", parsed, min),
                    format!("Use a value >= {}", min),
                ));
            }
        }

        if let Some(max) = max {
            if parsed > max {
                return Err(invalid(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is above maximum {}", parsed, max),
                    format!("Use a value <= {}", max),
                ));
            }
        }

        Ok(parsed)
    }

    /// Validate unsigned integer values with optional range
    pub fn validate_usize(
        field: &str,
        value: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> ValidationResult<usize> {
        if value.parse::<usize>().is_err() {
            return Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid unsigned integer format",
                "Use a valid positive integer number",
            ));
        }
        validate_integer(field, value, min, max).map(|v| v as usize)
    }

    /// Validate enumerated values (case-insensitive)
    pub fn validate_enum(field: &str, value: &str, valid_values: &[&str]) -> ValidationResult<String> {
        let lowered = value.to_lowercase();
        if valid_values.iter().any(|v| v.to_lowercase() == lowered) {
            Ok(lowered)
        } else {
            Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidValue,
                format!("Invalid value, must be one of: {}", valid_values.join(", ")),
                format!("Use one of: {}", valid_values.join(", ")),
            ))
        }
    }

    /// Validate IP address
    pub fn validate_ip_address(field: &str, value: &str) -> ValidationResult<IpAddr> {
        IpAddr::from_str(value).map_err(|_| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid IP address format",
                "Use a valid IPv4 or IPv6 address (e.g., 0.0.0.0 or ::1)",
            )
        })
    }

    /// Validate port number
    pub fn validate_port(field: &str, value: &str) -> ValidationResult<u16> {
        let port = value.parse::<u16>().map_err(|_| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid port number format",
                "Use a number between 1 and 65535",
            )
        })?;

        if port == 0 {
            return Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidRange,
                "Port number cannot be 0",
                "Use a port between 1 and 65535",
            ));
        }

        Ok(port)
    }

    /// Validate an absolute http(s) URL
    pub fn validate_url(field: &str, value: &str) -> ValidationResult<Url> {
        let url = Url::parse(value).map_err(|e| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                format!("Invalid URL: {}", e),
                "Use an absolute URL such as https://my-service.onrender.com",
            )
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidValue,
                format!("Unsupported URL scheme '{}'", url.scheme()),
                "Use an http or https URL",
            ));
        }

        Ok(url)
    }

    /// Validate an HTTP header name
    pub fn validate_header_name(field: &str, value: &str) -> ValidationResult<HeaderName> {
        HeaderName::from_bytes(value.as_bytes()).map_err(|e| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                format!("Invalid header name: {}", e),
                "Use a token without spaces or separators, such as X-API-Key",
            )
        })
    }

    /// Validate a free-form string that must not be blank
    pub fn validate_non_empty(field: &str, value: &str) -> ValidationResult<String> {
        if value.trim().is_empty() {
            return Err(invalid(
                field,
                value,
                ConfigErrorType::Required,
                "Value cannot be blank",
                format!("Set {} to a non-empty value", field),
            ));
        }
        Ok(value.to_string())
    }
}

/// Schema-driven validator for the gateway environment
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the process environment
    pub fn validate() -> Result<ValidationResults, ValidationResults> {
        Self::validate_with(|key| env::var(key).ok())
    }

    /// Validate the values returned by `lookup`; unset variables fall back to
    /// the registry default.
    pub fn validate_with<F>(lookup: F) -> Result<ValidationResults, ValidationResults>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut results = ValidationResults::new();

        info!("Starting configuration validation...");

        for param in CONFIG_PARAMS {
            let value = lookup(param.name)
                .or_else(|| param.default_value.map(String::from))
                .unwrap_or_default();

            if value.is_empty() {
                if param.required {
                    results.add(
                        param.validation_level,
                        ConfigValidationError {
                            field: param.name.to_string(),
                            value: String::new(),
                            error_type: ConfigErrorType::Required,
                            message: "Required parameter is missing".to_string(),
                            suggestion: Some(format!("Set {} environment variable", param.name)),
                        },
                    );
                }
                continue;
            }

            if let Err(error) = Self::validate_parameter(param, &value) {
                results.add(param.validation_level, error);
            }
        }

        Self::validate_cross_dependencies(&mut results, &lookup);

        results.print_summary();

        if results.is_valid {
            Ok(results)
        } else {
            Err(results)
        }
    }

    fn validate_parameter(param: &ConfigParam, value: &str) -> ValidationResult<()> {
        match param.param_type {
            ConfigType::String => {
                validators::validate_non_empty(param.name, value)?;
            }
            ConfigType::Integer => {
                validators::validate_integer(param.name, value, param.min_value, param.max_value)?;
            }
            ConfigType::UnsignedInteger => {
                validators::validate_usize(param.name, value, param.min_value, param.max_value)?;
            }
            ConfigType::Boolean => {
                validators::validate_boolean(param.name, value)?;
            }
            ConfigType::IpAddress => {
                validators::validate_ip_address(param.name, value)?;
            }
            ConfigType::Port => {
                validators::validate_port(param.name, value)?;
            }
            ConfigType::Url => {
                validators::validate_url(param.name, value)?;
            }
            ConfigType::HeaderName => {
                validators::validate_header_name(param.name, value)?;
            }
            ConfigType::Enum(valid_values) => {
                validators::validate_enum(param.name, value, valid_values)?;
            }
        }
        Ok(())
    }

    /// Checks that span several variables
    fn validate_cross_dependencies<F>(results: &mut ValidationResults, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for secret in ["API_KEY", "YOUTUBE_API_KEY"] {
            let value = lookup(secret);
            if value.as_deref().unwrap_or(defaults::PLACEHOLDER_API_KEY)
                == defaults::PLACEHOLDER_API_KEY
            {
                results.add_warning(ConfigValidationError {
                    field: secret.to_string(),
                    value: "<placeholder>".to_string(),
                    error_type: ConfigErrorType::InsecureDefault,
                    message: "Placeholder secret in use".to_string(),
                    suggestion: Some(format!("Set {} to a real secret", secret)),
                });
            }
        }

        let min = lookup("KEEP_ALIVE_MIN_INTERVAL_SECONDS").and_then(|v| v.parse::<i64>().ok());
        let max = lookup("KEEP_ALIVE_MAX_INTERVAL_SECONDS").and_then(|v| v.parse::<i64>().ok());
        if let (Some(min), Some(max)) = (min, max) {
            if min > 0 && max > 0 && max < min {
                results.add_warning(ConfigValidationError {
                    field: "KEEP_ALIVE_MAX_INTERVAL_SECONDS".to_string(),
                    value: max.to_string(),
                    error_type: ConfigErrorType::InvalidRange,
                    message: format!("Upper bound is below the lower bound {}", min),
                    suggestion: Some("The upper bound will be raised to the lower bound".to_string()),
                });
            }
        }

        let keep_alive_enabled = lookup("KEEP_ALIVE_ENABLED")
            .and_then(|v| validators::validate_boolean("KEEP_ALIVE_ENABLED", &v).ok())
            .unwrap_or(true);
        if keep_alive_enabled && lookup("RENDER_EXTERNAL_URL").is_none() {
            info!("RENDER_EXTERNAL_URL not set, keep-alive will ping the local loopback address");
        }
    }

    /// Generate a sample configuration file with all parameters and descriptions
    pub fn generate_sample_config() -> String {
        let mut output = String::new();
        output.push_str("# YouTube gateway configuration file\n");
        output.push_str("# Values here are only used when the environment variable is unset\n");

        let mut current_category = "";
        for param in CONFIG_PARAMS {
            let category = if param.name.starts_with("KEEP_ALIVE") || param.name == "RENDER_EXTERNAL_URL" {
                "Keep-Alive Configuration"
            } else if param.name.starts_with("METRICS") {
                "Metrics Configuration"
            } else if param.name.starts_with("YOUTUBE") || param.name.starts_with("UPSTREAM") {
                "Upstream Configuration"
            } else if param.name.starts_with("API_KEY") {
                "Authentication"
            } else {
                "Server Configuration"
            };

            if category != current_category {
                output.push_str(&format!("\n# ======== {} ========\n", category));
                current_category = category;
            }

            output.push_str(&format!("# {}\n", param.description));
            match param.default_value {
                Some(default) => output.push_str(&format!("{} = {}\n\n", param.name, toml_literal(param, default))),
                None => output.push_str(&format!("# {} = \"\"\n\n", param.name)),
            }
        }
        output
    }
}

fn toml_literal(param: &ConfigParam, value: &str) -> String {
    match param.param_type {
        ConfigType::Integer | ConfigType::UnsignedInteger | ConfigType::Port | ConfigType::Boolean => {
            value.to_string()
        }
        _ => format!("\"{}\"", value),
    }
}
