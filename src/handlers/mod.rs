// Gateway HTTP handlers
//
// Route handlers, the API key middleware and query string helpers.

pub mod authentication;
pub mod params;
pub mod routes;

#[cfg(test)]
mod tests;

// Re-export handlers for easier access
pub use self::routes::{
    configure_routes, get_thumbnail, get_title, get_transcript, health, list_transcripts,
    metrics_endpoint, translate_transcript,
};
// Re-export authentication middleware
pub use self::authentication::ApiKeyGate;
