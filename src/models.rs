// Gateway data models
//
// Response bodies returned by the HTTP routes.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::upstream::{FetchedTranscript, TranscriptSnippet, TranscriptTrack, TranslationLanguage};

/// Error response for API
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub detail: String,
}

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            message: "Service is running",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ThumbnailResponse {
    /// Thumbnail set as returned by the provider
    pub thumbnails: Map<String, Value>,
}

/// Body of `/get_transcript` and `/translate_transcript`
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: Vec<TranscriptSnippet>,
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
}

impl From<FetchedTranscript> for TranscriptResponse {
    fn from(fetched: FetchedTranscript) -> Self {
        Self {
            transcript: fetched.snippets,
            video_id: fetched.video_id,
            language: fetched.language,
            language_code: fetched.language_code,
            is_generated: fetched.is_generated,
        }
    }
}

/// One entry of `/list_transcripts`
#[derive(Debug, Serialize)]
pub struct TranscriptInfo {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
    pub translation_languages: Vec<TranslationLanguage>,
}

impl From<&TranscriptTrack> for TranscriptInfo {
    fn from(track: &TranscriptTrack) -> Self {
        Self {
            video_id: track.video_id.clone(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            is_translatable: track.is_translatable(),
            translation_languages: track.translation_languages.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptListResponse {
    pub transcripts: Vec<TranscriptInfo>,
}
