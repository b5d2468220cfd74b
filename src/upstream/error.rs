// Upstream adapter errors
//
// Every failure an adapter can report. Route handlers convert these into HTTP
// responses; only `VideoNotFound` gets a dedicated status code.

use thiserror::Error;

/// Errors raised by the metadata and transcript adapters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// The metadata provider returned an empty result set
    #[error("Video not found: {0}")]
    VideoNotFound(String),

    /// Transport-level failure (connect, DNS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with a non-success status
    #[error("Provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider answered but the payload was not what we expect
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// Subtitles are disabled for this video
    #[error("Subtitles are disabled for video {0}")]
    TranscriptsDisabled(String),

    /// None of the requested language codes has a transcript
    #[error(
        "No transcript found for video {video_id} in any of the requested languages {requested:?} (available: {available:?})"
    )]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    /// The selected source transcript cannot be translated
    #[error("Transcript for video {0} is not translatable")]
    NotTranslatable(String),

    /// The target language is not offered for the selected transcript
    #[error("Translation language '{0}' is not available for this transcript")]
    TranslationLanguageNotAvailable(String),

    /// The video no longer exists
    #[error("Video {0} is unavailable")]
    VideoUnavailable(String),

    /// The video exists but cannot be played
    #[error("Video {video_id} is unplayable: {reason}")]
    VideoUnplayable { video_id: String, reason: String },

    /// YouTube refused the request (bot check, captcha, rate limit)
    #[error("YouTube is blocking requests for video {0}")]
    RequestBlocked(String),

    /// The video is age restricted and needs a signed-in session
    #[error("Video {0} is age restricted")]
    AgeRestricted(String),

    /// The timed text URL requires a proof-of-origin token
    #[error("Transcript for video {0} requires a PO token")]
    PoTokenRequired(String),

    /// The consent interstitial could not be cleared
    #[error("Failed to accept the YouTube consent page for video {0}")]
    ConsentRequired(String),
}

impl UpstreamError {
    /// Create an Http error from anything printable
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Self::Http(msg.into())
    }

    /// Create a Malformed error from anything printable
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::Malformed(msg.into())
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::VideoNotFound(_) => "not_found",
            UpstreamError::Http(_) => "http",
            UpstreamError::Api { .. } => "api",
            UpstreamError::Malformed(_) => "malformed",
            UpstreamError::RequestBlocked(_) | UpstreamError::ConsentRequired(_) => "blocked",
            _ => "transcript",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Http(format!("request timed out: {}", err))
        } else if err.is_decode() {
            UpstreamError::Malformed(err.to_string())
        } else {
            UpstreamError::Http(err.to_string())
        }
    }
}
