use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod watch;

use crate::config::YoutubeConfig;

/// One timed caption unit as YouTube returns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// A caption track listed on a video's watch page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    /// Human readable track name, e.g. "English (auto-generated)"
    pub name: String,

    pub language_code: String,

    /// Automatic speech recognition track
    pub is_generated: bool,

    pub is_translatable: bool,

    /// Timed-text endpoint for this track
    pub base_url: String,
}

/// Failures signalled while talking to YouTube
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("No transcript found for video {video_id} in {requested:?} (available: {available:?})")]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("No transcripts are available for video {video_id}")]
    NoTranscriptAvailable { video_id: String },

    #[error("Subtitles are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error("Video {video_id} is no longer available")]
    VideoUnavailable { video_id: String },

    #[error("YouTube is rate limiting requests for video {video_id}")]
    TooManyRequests { video_id: String },

    #[error("Could not get past the cookie consent page for video {video_id}")]
    ConsentRequired { video_id: String },

    #[error("Invalid video id {0:?}: pass the video id, not the URL")]
    InvalidVideoId(String),

    #[error("YouTube answered HTTP {status} for {url}")]
    RequestFailed { status: u16, url: String },

    #[error("Unexpected response for video {video_id}: {reason}")]
    MalformedResponse { video_id: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Transcript retrieval capability the gateway delegates to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// List every caption track available for a video
    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<CaptionTrack>, FetchError>;

    /// Fetch the segments of one track. `languages` is tried in order; empty means
    /// whichever track the source ranks first.
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>, FetchError>;
}

/// Scrapes caption tracks from youtube.com watch pages
pub struct YoutubeTranscriptSource {
    client: Client,
    watch_url: String,
}

impl YoutubeTranscriptSource {
    pub fn new(config: &YoutubeConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self::with_client(client, config.watch_url.clone()))
    }

    /// Use a ready-made client against `watch_url` instead of youtube.com
    pub fn with_client(client: Client, watch_url: impl Into<String>) -> Self {
        Self {
            client,
            watch_url: watch_url.into(),
        }
    }

    /// Download the watch page, getting past the consent interstitial once if needed
    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, FetchError> {
        let html = self.get_watch_page(video_id, None).await?;

        match watch::consent_value(&html) {
            Some(value) => {
                tracing::debug!("Consent page served for {}, retrying with cookie", video_id);
                let cookie = format!("CONSENT=YES+{}", value);
                let html = self.get_watch_page(video_id, Some(&cookie)).await?;

                if watch::is_consent_page(&html) {
                    return Err(FetchError::ConsentRequired {
                        video_id: video_id.to_string(),
                    });
                }
                Ok(html)
            }
            None => Ok(html),
        }
    }

    async fn get_watch_page(&self, video_id: &str, cookie: Option<&str>) -> Result<String, FetchError> {
        let url = format!("{}?v={}", self.watch_url, urlencoding::encode(video_id));
        tracing::debug!("Fetching watch page: {}", url);

        let mut request = self.client.get(&url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::RequestFailed {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.text().await?)
    }

    async fn caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, FetchError> {
        if video_id.starts_with("http://") || video_id.starts_with("https://") {
            return Err(FetchError::InvalidVideoId(video_id.to_string()));
        }

        let html = self.fetch_watch_page(video_id).await?;
        watch::extract_caption_tracks(&html, video_id)
    }

    async fn download_track(
        &self,
        video_id: &str,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptSegment>, FetchError> {
        let url = watch::timedtext_url(&track.base_url, video_id)?;
        tracing::debug!(
            "Downloading {} track for {} ({})",
            track.language_code,
            video_id,
            if track.is_generated { "generated" } else { "manual" }
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::RequestFailed {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        watch::parse_timed_text(&body, video_id)
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<CaptionTrack>, FetchError> {
        self.caption_tracks(video_id).await
    }

    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>, FetchError> {
        let tracks = self.caption_tracks(video_id).await?;
        let track = watch::select_track(&tracks, languages, video_id)?;
        self.download_track(video_id, track).await
    }
}
