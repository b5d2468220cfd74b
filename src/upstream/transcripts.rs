//! Transcript adapter
//!
//! Lists the caption tracks of a video, picks the best match for a prioritized
//! list of language codes, and fetches (optionally machine-translated) timed
//! text. The data flow against YouTube is:
//!
//! 1. watch page HTML, to obtain the innertube API key (and clear the consent
//!    interstitial when it shows up);
//! 2. innertube `player` call, which carries the caption track list;
//! 3. the timed text URL of the selected track.

use async_trait::async_trait;
use log::{debug, warn};
use regex::Regex;
use reqwest::cookie::Jar;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::error::UpstreamError;
use super::timedtext::TimedTextParser;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// One timed segment of a transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSnippet {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A language a transcript can be machine-translated into
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationLanguage {
    pub language: String,
    pub language_code: String,
}

/// An available (not yet fetched) caption track
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptTrack {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub translation_languages: Vec<TranslationLanguage>,
    pub(crate) url: String,
}

impl TranscriptTrack {
    pub fn new(
        video_id: impl Into<String>,
        language: impl Into<String>,
        language_code: impl Into<String>,
        is_generated: bool,
        translation_languages: Vec<TranslationLanguage>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            language: language.into(),
            language_code: language_code.into(),
            is_generated,
            translation_languages,
            url: url.into(),
        }
    }

    pub fn is_translatable(&self) -> bool {
        !self.translation_languages.is_empty()
    }

    /// Timed text URL of this track
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Derive the track machine-translated into `language_code`
    pub fn translate(&self, language_code: &str) -> Result<TranscriptTrack, UpstreamError> {
        if !self.is_translatable() {
            return Err(UpstreamError::NotTranslatable(self.video_id.clone()));
        }

        let target = self
            .translation_languages
            .iter()
            .find(|l| l.language_code == language_code)
            .ok_or_else(|| UpstreamError::TranslationLanguageNotAvailable(language_code.to_string()))?;

        Ok(TranscriptTrack {
            video_id: self.video_id.clone(),
            language: target.language.clone(),
            language_code: target.language_code.clone(),
            is_generated: true,
            translation_languages: Vec::new(),
            url: format!("{}&tlang={}", self.url, language_code),
        })
    }
}

/// A fetched transcript with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTranscript {
    pub snippets: Vec<TranscriptSnippet>,
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
}

/// Every caption track available for one video
#[derive(Debug, Clone, Default)]
pub struct TranscriptList {
    pub video_id: String,
    manually_created: Vec<TranscriptTrack>,
    generated: Vec<TranscriptTrack>,
}

impl TranscriptList {
    pub fn new(
        video_id: impl Into<String>,
        manually_created: Vec<TranscriptTrack>,
        generated: Vec<TranscriptTrack>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            manually_created,
            generated,
        }
    }

    /// Manually created tracks first, then generated ones
    pub fn iter(&self) -> impl Iterator<Item = &TranscriptTrack> {
        self.manually_created.iter().chain(self.generated.iter())
    }

    /// First language code with a track wins; manual tracks beat generated
    /// ones for the same code.
    pub fn find_transcript(&self, language_codes: &[String]) -> Result<&TranscriptTrack, UpstreamError> {
        self.find_in(language_codes, &[&self.manually_created, &self.generated])
    }

    pub fn find_manually_created_transcript(
        &self,
        language_codes: &[String],
    ) -> Result<&TranscriptTrack, UpstreamError> {
        self.find_in(language_codes, &[&self.manually_created])
    }

    pub fn find_generated_transcript(
        &self,
        language_codes: &[String],
    ) -> Result<&TranscriptTrack, UpstreamError> {
        self.find_in(language_codes, &[&self.generated])
    }

    fn find_in<'a>(
        &'a self,
        language_codes: &[String],
        groups: &[&'a Vec<TranscriptTrack>],
    ) -> Result<&'a TranscriptTrack, UpstreamError> {
        for code in language_codes {
            for group in groups {
                if let Some(track) = group.iter().find(|t| &t.language_code == code) {
                    return Ok(track);
                }
            }
        }

        Err(UpstreamError::NoTranscriptFound {
            video_id: self.video_id.clone(),
            requested: language_codes.to_vec(),
            available: self.iter().map(|t| t.language_code.clone()).collect(),
        })
    }

    /// Build the list from an innertube `player` response
    pub fn from_player_response(video_id: &str, data: &Value) -> Result<Self, UpstreamError> {
        assert_playability(video_id, data)?;

        let captions = data
            .get("captions")
            .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
            .ok_or_else(|| UpstreamError::TranscriptsDisabled(video_id.to_string()))?;

        let translation_languages: Vec<TranslationLanguage> = captions
            .get("translationLanguages")
            .and_then(|tl| tl.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|lang| {
                        Some(TranslationLanguage {
                            language_code: lang.get("languageCode")?.as_str()?.to_string(),
                            language: display_name(lang.get("languageName")?)?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut manually_created = Vec::new();
        let mut generated = Vec::new();

        let tracks = captions
            .get("captionTracks")
            .and_then(|ct| ct.as_array())
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        for caption in tracks {
            let Some(language_code) = caption.get("languageCode").and_then(|l| l.as_str()) else {
                continue;
            };
            let Some(base_url) = caption.get("baseUrl").and_then(|u| u.as_str()) else {
                continue;
            };

            let language = caption
                .get("name")
                .and_then(display_name)
                .unwrap_or_else(|| language_code.to_string());
            let is_generated = caption.get("kind").and_then(|k| k.as_str()) == Some("asr");
            let is_translatable = caption
                .get("isTranslatable")
                .and_then(|t| t.as_bool())
                .unwrap_or(false);

            let track = TranscriptTrack::new(
                video_id,
                language,
                language_code,
                is_generated,
                if is_translatable {
                    translation_languages.clone()
                } else {
                    Vec::new()
                },
                base_url.replace("&fmt=srv3", ""),
            );

            if is_generated {
                generated.push(track);
            } else {
                manually_created.push(track);
            }
        }

        if manually_created.is_empty() && generated.is_empty() {
            return Err(UpstreamError::TranscriptsDisabled(video_id.to_string()));
        }

        Ok(Self::new(video_id, manually_created, generated))
    }
}

impl<'a> IntoIterator for &'a TranscriptList {
    type Item = &'a TranscriptTrack;
    type IntoIter = std::iter::Chain<
        std::slice::Iter<'a, TranscriptTrack>,
        std::slice::Iter<'a, TranscriptTrack>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.manually_created.iter().chain(self.generated.iter())
    }
}

/// Innertube labels come either as `{"simpleText": ..}` or `{"runs": [{"text": ..}]}`
fn display_name(label: &Value) -> Option<String> {
    if let Some(text) = label.get("simpleText").and_then(|t| t.as_str()) {
        return Some(text.to_string());
    }
    label
        .get("runs")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

fn assert_playability(video_id: &str, data: &Value) -> Result<(), UpstreamError> {
    let Some(playability) = data.get("playabilityStatus") else {
        return Ok(());
    };

    let status = playability.get("status").and_then(|s| s.as_str()).unwrap_or("");
    if status == "OK" || status.is_empty() {
        return Ok(());
    }

    let reason = playability.get("reason").and_then(|r| r.as_str()).unwrap_or("");
    match status {
        "LOGIN_REQUIRED" if reason.contains("not a bot") => {
            Err(UpstreamError::RequestBlocked(video_id.to_string()))
        }
        "LOGIN_REQUIRED" if reason.contains("inappropriate") => {
            Err(UpstreamError::AgeRestricted(video_id.to_string()))
        }
        "ERROR" if reason.contains("unavailable") => {
            Err(UpstreamError::VideoUnavailable(video_id.to_string()))
        }
        _ => Err(UpstreamError::VideoUnplayable {
            video_id: video_id.to_string(),
            reason: reason.to_string(),
        }),
    }
}

/// Transcript lookups for a single video
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// All caption tracks available for `video_id`
    async fn list_transcripts(&self, video_id: &str) -> Result<TranscriptList, UpstreamError>;

    /// Download and parse the timed text of one track
    async fn fetch_track(
        &self,
        track: &TranscriptTrack,
        preserve_formatting: bool,
    ) -> Result<FetchedTranscript, UpstreamError>;

    /// Fetch the best match among `languages` (priority order)
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
        preserve_formatting: bool,
    ) -> Result<FetchedTranscript, UpstreamError> {
        let list = self.list_transcripts(video_id).await?;
        let track = list.find_transcript(languages)?;
        self.fetch_track(track, preserve_formatting).await
    }

    /// Fetch the best match among `source_languages`, translated to `target_language`
    async fn translate(
        &self,
        video_id: &str,
        source_languages: &[String],
        target_language: &str,
    ) -> Result<FetchedTranscript, UpstreamError> {
        let list = self.list_transcripts(video_id).await?;
        let source = list.find_transcript(source_languages)?;
        debug!(
            "Translating {} transcript of video {} to {}",
            source.language_code, video_id, target_language
        );
        let translated = source.translate(target_language)?;
        self.fetch_track(&translated, false).await
    }
}

fn innertube_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid innertube key regex")
    })
}

fn consent_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid consent regex"))
}

/// Transcript provider backed by YouTube's public caption endpoints
pub struct YouTubeTranscriptClient {
    client: reqwest::Client,
    cookies: Arc<Jar>,
}

impl YouTubeTranscriptClient {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US"),
        );

        let cookies = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .cookie_provider(Arc::clone(&cookies))
            .build()
            .map_err(|e| UpstreamError::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, cookies })
    }

    async fn fetch_video_html(&self, video_id: &str) -> Result<String, UpstreamError> {
        let html = self.get_watch_page(video_id).await?;
        if !html.contains("action=\"https://consent.youtube.com/s\"") {
            return Ok(html);
        }

        debug!("Consent page served for video {}, accepting", video_id);
        self.accept_consent(&html, video_id)?;

        let html = self.get_watch_page(video_id).await?;
        if html.contains("action=\"https://consent.youtube.com/s\"") {
            warn!("Consent page still served for video {}", video_id);
            return Err(UpstreamError::ConsentRequired(video_id.to_string()));
        }
        Ok(html)
    }

    async fn get_watch_page(&self, video_id: &str) -> Result<String, UpstreamError> {
        let response = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .send()
            .await?;
        let response = check_status(response, video_id)?;
        Ok(response.text().await?)
    }

    fn accept_consent(&self, html: &str, video_id: &str) -> Result<(), UpstreamError> {
        let value = consent_value_regex()
            .captures(html)
            .and_then(|c| c.get(1))
            .ok_or_else(|| UpstreamError::ConsentRequired(video_id.to_string()))?;

        let url = url::Url::parse("https://www.youtube.com")
            .map_err(|e| UpstreamError::http(e.to_string()))?;
        self.cookies.add_cookie_str(
            &format!("CONSENT=YES+{}; Domain=.youtube.com; Path=/", value.as_str()),
            &url,
        );
        Ok(())
    }

    async fn fetch_player_data(&self, video_id: &str, api_key: &str) -> Result<Value, UpstreamError> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION
                }
            },
            "videoId": video_id
        });

        let response = self
            .client
            .post(INNERTUBE_PLAYER_URL)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, video_id)?;
        Ok(response.json().await?)
    }
}

/// Find the innertube API key in a watch page
pub fn extract_innertube_api_key(html: &str, video_id: &str) -> Result<String, UpstreamError> {
    if html.contains("class=\"g-recaptcha\"") {
        return Err(UpstreamError::RequestBlocked(video_id.to_string()));
    }

    innertube_key_regex()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| UpstreamError::malformed(format!("no innertube API key in watch page of {}", video_id)))
}

fn check_status(response: reqwest::Response, video_id: &str) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(UpstreamError::RequestBlocked(video_id.to_string()));
    }
    if !status.is_success() {
        return Err(UpstreamError::Api {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown error").to_string(),
        });
    }
    Ok(response)
}

#[async_trait]
impl TranscriptProvider for YouTubeTranscriptClient {
    async fn list_transcripts(&self, video_id: &str) -> Result<TranscriptList, UpstreamError> {
        let html = self.fetch_video_html(video_id).await?;
        let api_key = extract_innertube_api_key(&html, video_id)?;
        let data = self.fetch_player_data(video_id, &api_key).await?;
        TranscriptList::from_player_response(video_id, &data)
    }

    async fn fetch_track(
        &self,
        track: &TranscriptTrack,
        preserve_formatting: bool,
    ) -> Result<FetchedTranscript, UpstreamError> {
        if track.url.contains("&exp=xpe") {
            return Err(UpstreamError::PoTokenRequired(track.video_id.clone()));
        }

        let response = self.client.get(&track.url).send().await?;
        let response = check_status(response, &track.video_id)?;
        let xml = response.text().await?;

        let snippets = TimedTextParser::new(preserve_formatting).parse(&xml)?;
        debug!(
            "Fetched {} snippets for video {} ({})",
            snippets.len(),
            track.video_id,
            track.language_code
        );

        Ok(FetchedTranscript {
            snippets,
            video_id: track.video_id.clone(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
        })
    }
}
