// Upstream client adapters
//
// Thin wrappers around the two external providers: the YouTube Data API for
// video metadata and YouTube's caption endpoints for transcripts. Adapters are
// stateless and never retry.

pub mod error;
pub mod metadata;
pub mod timedtext;
pub mod transcripts;

use std::sync::Arc;
use std::time::Duration;

pub use self::error::UpstreamError;
pub use self::metadata::{MetadataProvider, VideoSnippet, YouTubeDataClient};
pub use self::transcripts::{
    FetchedTranscript, TranscriptList, TranscriptProvider, TranscriptSnippet, TranscriptTrack,
    TranslationLanguage, YouTubeTranscriptClient,
};

use crate::config::YouTubeConfig;

/// The adapters shared by all route handlers
#[derive(Clone)]
pub struct Upstreams {
    pub metadata: Arc<dyn MetadataProvider>,
    pub transcripts: Arc<dyn TranscriptProvider>,
}

impl Upstreams {
    pub fn new(
        metadata: Arc<dyn MetadataProvider>,
        transcripts: Arc<dyn TranscriptProvider>,
    ) -> Self {
        Self {
            metadata,
            transcripts,
        }
    }

    /// Build the real YouTube-backed adapters
    pub fn from_config(config: &YouTubeConfig) -> Result<Self, UpstreamError> {
        let timeout = Duration::from_secs(config.upstream_timeout);
        let metadata = YouTubeDataClient::new(
            config.api_base_url.clone(),
            config.api_key.clone(),
            timeout,
        )?;
        let transcripts = YouTubeTranscriptClient::new(timeout)?;
        Ok(Self::new(Arc::new(metadata), Arc::new(transcripts)))
    }
}
