// Gateway configuration
//
// Configuration structures and defaults for the YouTube gateway. Every struct
// reads its values from environment variables in its `Default` impl; the
// optional config file is merged into the environment beforehand by
// `config_loader`.

use std::env;
use std::time::Duration;

use crate::keep_alive::{self, JitterPolicy};

/// Default values for configuration
pub mod defaults {
    // Bind address for the HTTP server
    pub const HOST: &str = "0.0.0.0";

    // Bind port for the HTTP server
    pub const PORT: u16 = 8000;

    // Client disconnect timeout in seconds
    pub const TIMEOUT_SECONDS: u64 = 60;

    // HTTP connection keep-alive in seconds
    pub const HTTP_KEEPALIVE_SECONDS: u64 = 75;

    // Placeholder secret shipped in sample configs
    pub const PLACEHOLDER_API_KEY: &str = "your-api-key-here";

    // Header carrying the gateway API key
    pub const API_KEY_HEADER: &str = "X-API-Key";

    // YouTube Data API v3 base URL
    pub const YOUTUBE_DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3";

    // Timeout for one upstream call
    pub const UPSTREAM_TIMEOUT_SECONDS: u64 = 30;

    // Timeout for one keep-alive ping
    pub const PING_TIMEOUT_SECONDS: u64 = 30;

    // Bounded wait for the keep-alive task at shutdown
    pub const SHUTDOWN_GRACE_SECONDS: u64 = 10;

    // Metrics backend when none is configured
    pub const METRICS_BACKEND: &str = "none";
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .and_then(|s| match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Client disconnect timeout in seconds
    pub timeout: u64,
    /// Connection keep-alive in seconds
    pub keepalive: u64,
    /// Number of actix workers, 0 lets actix decide
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::var("GATEWAY_HOST").unwrap_or_else(|_| String::from(defaults::HOST)),
            port: env_parse("PORT").unwrap_or(defaults::PORT),
            timeout: env_parse("GATEWAY_TIMEOUT").unwrap_or(defaults::TIMEOUT_SECONDS),
            keepalive: env_parse("GATEWAY_KEEPALIVE").unwrap_or(defaults::HTTP_KEEPALIVE_SECONDS),
            workers: env_parse("HTTP_WORKER_NUMBER").unwrap_or(0),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

/// API key gate settings
#[derive(Clone)]
pub struct AuthConfig {
    /// Name of the header carrying the key
    pub header_name: String,
    /// Expected secret
    pub api_key: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("header_name", &self.header_name)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header_name: env::var("API_KEY_HEADER")
                .unwrap_or_else(|_| String::from(defaults::API_KEY_HEADER)),
            api_key: env::var("API_KEY")
                .unwrap_or_else(|_| String::from(defaults::PLACEHOLDER_API_KEY)),
        }
    }
}

impl AuthConfig {
    pub fn new<H: Into<String>, K: Into<String>>(header_name: H, api_key: K) -> Self {
        Self {
            header_name: header_name.into(),
            api_key: api_key.into(),
        }
    }
}

/// Upstream provider settings
#[derive(Clone)]
pub struct YouTubeConfig {
    /// YouTube Data API credential
    pub api_key: String,
    pub api_base_url: String,
    /// Per-call timeout in seconds
    pub upstream_timeout: u64,
}

impl std::fmt::Debug for YouTubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeConfig")
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("YOUTUBE_API_KEY")
                .unwrap_or_else(|_| String::from(defaults::PLACEHOLDER_API_KEY)),
            api_base_url: env::var("YOUTUBE_DATA_API_URL")
                .unwrap_or_else(|_| String::from(defaults::YOUTUBE_DATA_API_URL)),
            upstream_timeout: env_parse("UPSTREAM_TIMEOUT_SECONDS")
                .unwrap_or(defaults::UPSTREAM_TIMEOUT_SECONDS),
        }
    }
}

/// Self keep-alive settings
#[derive(Clone, Debug)]
pub struct KeepAliveConfig {
    pub enabled: bool,
    /// Public base URL of this service, `/health` is appended
    pub base_url: String,
    // Raw values, normalised by JitterPolicy::from_secs
    pub min_interval_secs: i64,
    pub max_interval_secs: i64,
    pub failure_backoff_secs: i64,
    pub ping_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl KeepAliveConfig {
    /// Read the keep-alive settings, using `port` for the loopback fallback URL
    pub fn from_env(port: u16) -> Self {
        Self {
            enabled: env_flag("KEEP_ALIVE_ENABLED").unwrap_or(true),
            base_url: env::var("RENDER_EXTERNAL_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            min_interval_secs: env_parse("KEEP_ALIVE_MIN_INTERVAL_SECONDS")
                .unwrap_or(keep_alive::DEFAULT_MIN_INTERVAL_SECS as i64),
            max_interval_secs: env_parse("KEEP_ALIVE_MAX_INTERVAL_SECONDS")
                .unwrap_or(keep_alive::DEFAULT_MAX_INTERVAL_SECS as i64),
            failure_backoff_secs: env_parse("KEEP_ALIVE_FAILURE_BACKOFF_SECONDS")
                .unwrap_or(keep_alive::DEFAULT_FAILURE_BACKOFF_SECS as i64),
            ping_timeout_secs: env_parse("KEEP_ALIVE_PING_TIMEOUT_SECONDS")
                .unwrap_or(defaults::PING_TIMEOUT_SECONDS),
            shutdown_grace_secs: env_parse("KEEP_ALIVE_SHUTDOWN_GRACE_SECONDS")
                .unwrap_or(defaults::SHUTDOWN_GRACE_SECONDS),
        }
    }

    pub fn policy(&self) -> JitterPolicy {
        JitterPolicy::from_secs(
            self.min_interval_secs,
            self.max_interval_secs,
            self.failure_backoff_secs,
        )
    }

    pub fn health_url(&self) -> String {
        keep_alive::health_url(&self.base_url)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs.max(1))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self::from_env(env_parse("PORT").unwrap_or(defaults::PORT))
    }
}

/// Configuration for metrics collection and export
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// "prometheus" or "none"
    pub backend: String,
    /// Prefix for every exported metric name
    pub namespace: Option<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            backend: env::var("METRICS_BACKEND")
                .unwrap_or_else(|_| String::from(defaults::METRICS_BACKEND)),
            namespace: env::var("METRICS_NAMESPACE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Complete gateway configuration
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub youtube: YouTubeConfig,
    pub keep_alive: KeepAliveConfig,
    pub metrics: MetricsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        let keep_alive = KeepAliveConfig::from_env(server.port);
        Self {
            server,
            auth: AuthConfig::default(),
            youtube: YouTubeConfig::default(),
            keep_alive,
            metrics: MetricsConfig::default(),
        }
    }
}
