// YouTube gateway library
//
// This crate provides an HTTP gateway in front of YouTube video metadata and
// transcripts, protected by a static API key, plus a self keep-alive task
// that stops an idle hosting platform from suspending the process.

pub mod config;
pub mod config_loader;
pub mod config_validator;
pub mod context;
pub mod error;
pub mod handlers;
pub mod keep_alive;
pub mod metrics;
pub mod models;
pub mod upstream;

// Re-export common types for easier access
pub use config::GatewayConfig;
pub use context::AppContext;
pub use error::GatewayError;
pub use handlers::{configure_routes, ApiKeyGate};
pub use keep_alive::{JitterPolicy, KeepAliveTask};
pub use metrics::Metrics;
pub use models::{ErrorResponse, HealthResponse, TranscriptResponse};
pub use upstream::Upstreams;
