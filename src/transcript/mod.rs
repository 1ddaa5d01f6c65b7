use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::youtube::{CaptionTrack, FetchError, TranscriptSource};

pub use crate::youtube::TranscriptSegment;

/// Which shape of transcript a caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Single,
    AllLanguages,
    PlainText,
}

impl Mode {
    /// `all_langs` takes precedence over `plain_text`
    pub fn select(all_langs: bool, plain_text: bool) -> Self {
        if all_langs {
            Mode::AllLanguages
        } else if plain_text {
            Mode::PlainText
        } else {
            Mode::Single
        }
    }
}

/// A validated request for one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRequest {
    video_id: String,
    preferred_language: Option<String>,
    mode: Mode,
}

impl TranscriptRequest {
    /// Returns `None` when the video id is empty or only whitespace
    pub fn new(video_id: &str, preferred_language: Option<&str>, mode: Mode) -> Option<Self> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return None;
        }

        Some(Self {
            video_id: video_id.to_string(),
            preferred_language: preferred_language
                .map(str::trim)
                .filter(|lang| !lang.is_empty())
                .map(str::to_string),
            mode,
        })
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn preferred_language(&self) -> Option<&str> {
        self.preferred_language.as_deref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// Metadata about one available transcript track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageDescriptor {
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
}

impl From<CaptionTrack> for LanguageDescriptor {
    fn from(track: CaptionTrack) -> Self {
        Self {
            language: track.name,
            language_code: track.language_code,
            is_generated: track.is_generated,
            is_translatable: track.is_translatable,
        }
    }
}

/// Result of a gateway call, one variant per [`Mode`]
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptPayload {
    Segments(Vec<TranscriptSegment>),
    PlainText(String),
    Languages(Vec<LanguageDescriptor>),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("no transcript found")]
    NoTranscriptFound,

    #[error("transcripts are disabled")]
    TranscriptsDisabled,

    #[error("transcript retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("{0}")]
    Unknown(String),
}

impl From<FetchError> for GatewayError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NoTranscriptFound { .. } | FetchError::NoTranscriptAvailable { .. } => {
                GatewayError::NoTranscriptFound
            }
            FetchError::TranscriptsDisabled { .. } => GatewayError::TranscriptsDisabled,
            FetchError::VideoUnavailable { .. }
            | FetchError::TooManyRequests { .. }
            | FetchError::ConsentRequired { .. }
            | FetchError::InvalidVideoId(_)
            | FetchError::RequestFailed { .. }
            | FetchError::MalformedResponse { .. } => GatewayError::RetrievalFailed(err.to_string()),
            FetchError::Http(e) => GatewayError::Unknown(e.to_string()),
        }
    }
}

/// Join segment texts with single spaces, in the order given
pub fn join_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Thin call-through to a [`TranscriptSource`] with a boundary timeout
#[derive(Clone)]
pub struct TranscriptGateway {
    source: Arc<dyn TranscriptSource>,
    timeout: Duration,
}

impl TranscriptGateway {
    pub fn new(source: Arc<dyn TranscriptSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    async fn call<T, F>(&self, video_id: &str, fut: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                tracing::warn!("Transcript source failed for {}: {}", video_id, err);
                Err(err.into())
            }
            Err(_) => {
                tracing::warn!(
                    "Transcript source timed out after {}s for {}",
                    self.timeout.as_secs_f64(),
                    video_id
                );
                Err(GatewayError::RetrievalFailed(format!(
                    "timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    pub async fn fetch_single(
        &self,
        video_id: &str,
        preferred_language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>, GatewayError> {
        let languages: Vec<String> = preferred_language.map(str::to_string).into_iter().collect();
        self.call(video_id, self.source.fetch_transcript(video_id, &languages))
            .await
    }

    pub async fn fetch_all_languages(
        &self,
        video_id: &str,
    ) -> Result<Vec<LanguageDescriptor>, GatewayError> {
        let tracks = self
            .call(video_id, self.source.list_transcripts(video_id))
            .await?;
        Ok(tracks.into_iter().map(LanguageDescriptor::from).collect())
    }

    pub async fn fetch_plain_text(
        &self,
        video_id: &str,
        preferred_language: Option<&str>,
    ) -> Result<String, GatewayError> {
        let segments = self.fetch_single(video_id, preferred_language).await?;
        Ok(join_segments(&segments))
    }

    /// Run the operation matching the request's mode
    pub async fn execute(&self, request: &TranscriptRequest) -> Result<TranscriptPayload, GatewayError> {
        let video_id = request.video_id();
        let language = request.preferred_language();

        tracing::info!("Fetching transcript for {} ({:?})", video_id, request.mode());

        let payload = match request.mode() {
            Mode::Single => TranscriptPayload::Segments(self.fetch_single(video_id, language).await?),
            Mode::PlainText => TranscriptPayload::PlainText(self.fetch_plain_text(video_id, language).await?),
            Mode::AllLanguages => TranscriptPayload::Languages(self.fetch_all_languages(video_id).await?),
        };

        Ok(payload)
    }
}
