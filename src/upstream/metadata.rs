// Video metadata adapter
//
// Looks up a video's snippet (title and thumbnails) through the YouTube Data
// API v3 `videos` endpoint.

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::time::Duration;

use super::error::UpstreamError;

/// Title and thumbnail set of one video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSnippet {
    pub title: String,
    /// Thumbnail variants keyed by size name, passed through as returned
    pub thumbnails: Map<String, Value>,
}

/// Metadata lookups for a single video
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Return the snippet for `video_id`, or `UpstreamError::VideoNotFound`
    /// when the provider has no such video.
    async fn video_snippet(&self, video_id: &str) -> Result<VideoSnippet, UpstreamError>;
}

/// YouTube Data API v3 client
pub struct YouTubeDataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeDataClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl MetadataProvider for YouTubeDataClient {
    async fn video_snippet(&self, video_id: &str) -> Result<VideoSnippet, UpstreamError> {
        let url = format!("{}/videos", self.base_url);
        debug!("Requesting snippet for video {}", video_id);

        let response = self
            .client
            .get(&url)
            .query(&[("part", "snippet"), ("id", video_id), ("key", &self.api_key)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        videos_response(video_id, status, &text)
    }
}

/// Map a raw `videos.list` reply to a snippet or an upstream error
pub fn videos_response(
    video_id: &str,
    status: StatusCode,
    text: &str,
) -> Result<VideoSnippet, UpstreamError> {
    if !status.is_success() {
        // error bodies are usually JSON but proxies may answer with HTML
        let body: Value = serde_json::from_str(text).unwrap_or(Value::Null);
        return Err(UpstreamError::Api {
            status: status.as_u16(),
            message: api_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string()),
        });
    }

    let body: Value = serde_json::from_str(text)
        .map_err(|e| UpstreamError::malformed(format!("videos response is not valid JSON: {}", e)))?;
    parse_videos_response(video_id, &body)
}

/// Extract `error.message` from a Google API error body
fn api_error_message(body: &Value) -> Option<String> {
    body.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// Turn a `videos.list` response into the snippet of its first item
pub fn parse_videos_response(video_id: &str, body: &Value) -> Result<VideoSnippet, UpstreamError> {
    let items = body
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| UpstreamError::malformed("response has no 'items' array"))?;

    let snippet = match items.first() {
        Some(item) => item
            .get("snippet")
            .ok_or_else(|| UpstreamError::malformed("video item has no 'snippet'"))?,
        None => return Err(UpstreamError::VideoNotFound(video_id.to_string())),
    };

    let title = snippet
        .get("title")
        .and_then(|t| t.as_str())
        .ok_or_else(|| UpstreamError::malformed("snippet has no 'title'"))?
        .to_string();

    let thumbnails = snippet
        .get("thumbnails")
        .and_then(|t| t.as_object())
        .cloned()
        .ok_or_else(|| UpstreamError::malformed("snippet has no 'thumbnails' object"))?;

    Ok(VideoSnippet { title, thumbnails })
}
