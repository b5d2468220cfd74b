// In-memory adapters for route tests

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::upstream::{
    FetchedTranscript, MetadataProvider, TranscriptList, TranscriptProvider, TranscriptSnippet,
    TranscriptTrack, TranslationLanguage, UpstreamError, Upstreams, VideoSnippet,
};

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";

pub struct FakeMetadata {
    pub result: Result<VideoSnippet, UpstreamError>,
    pub calls: AtomicUsize,
}

impl FakeMetadata {
    pub fn found() -> Self {
        let mut thumbnails = Map::new();
        thumbnails.insert(
            "default".to_string(),
            json!({"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg", "width": 120, "height": 90}),
        );
        Self {
            result: Ok(VideoSnippet {
                title: "Never Gonna Give You Up".to_string(),
                thumbnails,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: UpstreamError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadata {
    async fn video_snippet(&self, _video_id: &str) -> Result<VideoSnippet, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

pub struct FakeTranscripts {
    pub result: Result<TranscriptList, UpstreamError>,
    pub calls: AtomicUsize,
    pub fetched_urls: Mutex<Vec<String>>,
}

impl FakeTranscripts {
    /// Manual `en` (translatable to fr and de), generated `de` and `es`
    pub fn with_tracks() -> Self {
        let translations = vec![
            TranslationLanguage {
                language: "French".to_string(),
                language_code: "fr".to_string(),
            },
            TranslationLanguage {
                language: "German".to_string(),
                language_code: "de".to_string(),
            },
        ];
        let base = "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ";
        let manual = vec![TranscriptTrack::new(
            VIDEO_ID,
            "English",
            "en",
            false,
            translations,
            format!("{}&lang=en", base),
        )];
        let generated = vec![
            TranscriptTrack::new(
                VIDEO_ID,
                "German (auto-generated)",
                "de",
                true,
                Vec::new(),
                format!("{}&lang=de&kind=asr", base),
            ),
            TranscriptTrack::new(
                VIDEO_ID,
                "Spanish (auto-generated)",
                "es",
                true,
                Vec::new(),
                format!("{}&lang=es&kind=asr", base),
            ),
        ];

        Self::from_list(TranscriptList::new(VIDEO_ID, manual, generated))
    }

    /// Only a manual `es` track, translatable to fr
    pub fn spanish_only() -> Self {
        let manual = vec![TranscriptTrack::new(
            VIDEO_ID,
            "Spanish",
            "es",
            false,
            vec![TranslationLanguage {
                language: "French".to_string(),
                language_code: "fr".to_string(),
            }],
            "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=es".to_string(),
        )];
        Self::from_list(TranscriptList::new(VIDEO_ID, manual, Vec::new()))
    }

    pub fn from_list(list: TranscriptList) -> Self {
        Self {
            result: Ok(list),
            calls: AtomicUsize::new(0),
            fetched_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: UpstreamError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
            fetched_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptProvider for FakeTranscripts {
    async fn list_transcripts(&self, _video_id: &str) -> Result<TranscriptList, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    async fn fetch_track(
        &self,
        track: &TranscriptTrack,
        preserve_formatting: bool,
    ) -> Result<FetchedTranscript, UpstreamError> {
        self.fetched_urls.lock().unwrap().push(track.url().to_string());
        let text = if preserve_formatting {
            "<b>hello</b> world"
        } else {
            "hello world"
        };
        Ok(FetchedTranscript {
            snippets: vec![TranscriptSnippet {
                text: text.to_string(),
                start: 0.0,
                duration: 1.5,
            }],
            video_id: track.video_id.clone(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
        })
    }
}

pub fn upstreams(metadata: &Arc<FakeMetadata>, transcripts: &Arc<FakeTranscripts>) -> Upstreams {
    Upstreams::new(metadata.clone(), transcripts.clone())
}

pub fn body_detail(body: &Value) -> &str {
    body["detail"].as_str().unwrap_or_default()
}
