use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Uri};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod error;

pub use error::ApiError;

use crate::auth::{Authorizer, API_KEY_HEADER, API_KEY_QUERY};
use crate::transcript::{
    LanguageDescriptor, Mode, TranscriptGateway, TranscriptPayload, TranscriptRequest, TranscriptSegment,
};
use crate::ServiceError;

const WELCOME_MESSAGE: &str =
    "Welcome to the YouTube Transcript API Service! Use /transcript/{video_id} endpoint.";

/// Language echoed back when the caller did not ask for one
pub const AUTO_DETECTED: &str = "auto-detected";

/// Shared, read-only request context
pub struct AppState {
    pub authorizer: Authorizer,
    pub gateway: TranscriptGateway,
}

impl AppState {
    pub fn new(authorizer: Authorizer, gateway: TranscriptGateway) -> Self {
        Self { authorizer, gateway }
    }
}

/// Successful response body, one variant per transcript mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ResponseEnvelope {
    #[serde(rename = "transcript_content")]
    Transcript {
        video_id: String,
        language: String,
        transcript: Vec<TranscriptSegment>,
    },

    #[serde(rename = "plain_text_transcript")]
    PlainText {
        video_id: String,
        language: String,
        transcript: String,
    },

    #[serde(rename = "available_languages")]
    AvailableLanguages {
        video_id: String,
        language: String,
        available_transcripts: Vec<LanguageDescriptor>,
    },
}

impl ResponseEnvelope {
    pub fn new(request: &TranscriptRequest, payload: TranscriptPayload) -> Self {
        let video_id = request.video_id().to_string();
        let language = request
            .preferred_language()
            .unwrap_or(AUTO_DETECTED)
            .to_string();

        match payload {
            TranscriptPayload::Segments(transcript) => ResponseEnvelope::Transcript {
                video_id,
                language,
                transcript,
            },
            TranscriptPayload::PlainText(transcript) => ResponseEnvelope::PlainText {
                video_id,
                language,
                transcript,
            },
            TranscriptPayload::Languages(available_transcripts) => {
                ResponseEnvelope::AvailableLanguages {
                    video_id,
                    language,
                    available_transcripts,
                }
            }
        }
    }

    pub fn video_id(&self) -> &str {
        match self {
            ResponseEnvelope::Transcript { video_id, .. }
            | ResponseEnvelope::PlainText { video_id, .. }
            | ResponseEnvelope::AvailableLanguages { video_id, .. } => video_id,
        }
    }

    pub fn language(&self) -> &str {
        match self {
            ResponseEnvelope::Transcript { language, .. }
            | ResponseEnvelope::PlainText { language, .. }
            | ResponseEnvelope::AvailableLanguages { language, .. } => language,
        }
    }
}

/// Query parameters accepted by `/transcript/{video_id}`
#[derive(Debug, Default, Deserialize)]
pub struct TranscriptQuery {
    pub lang: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub all_langs: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub plain_text: bool,
}

/// Parse a boolean query flag the way browsers and curl users tend to write them
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "y" | "t" => Some(true),
        "false" | "0" | "no" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_flag(&value).ok_or_else(|| {
        serde::de::Error::custom(format!("expected a boolean, got {:?}", value))
    })
}

/// Validate, authorize, fetch, and shape one transcript request
pub async fn handle(
    state: &AppState,
    video_id: &str,
    header_key: Option<&str>,
    query_key: Option<&str>,
    lang: Option<&str>,
    all_langs: bool,
    plain_text: bool,
) -> Result<ResponseEnvelope, ApiError> {
    admit(state, video_id, header_key, query_key)?;
    respond(state, video_id, lang, all_langs, plain_text).await
}

/// Empty-id check, then authorization. Nothing else about the request is looked at.
fn admit(
    state: &AppState,
    video_id: &str,
    header_key: Option<&str>,
    query_key: Option<&str>,
) -> Result<(), ApiError> {
    if video_id.trim().is_empty() {
        return Err(ApiError::empty_video_id());
    }

    state.authorizer.authorize(header_key, query_key)?;
    Ok(())
}

async fn respond(
    state: &AppState,
    video_id: &str,
    lang: Option<&str>,
    all_langs: bool,
    plain_text: bool,
) -> Result<ResponseEnvelope, ApiError> {
    let mode = Mode::select(all_langs, plain_text);
    let request = TranscriptRequest::new(video_id, lang, mode).ok_or_else(ApiError::empty_video_id)?;

    let payload = state.gateway.execute(&request).await?;
    Ok(ResponseEnvelope::new(&request, payload))
}

/// Build the service router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/transcript", get(missing_video_id))
        .route("/transcript/", get(missing_video_id))
        .route("/transcript/:video_id", get(get_transcript))
        .fallback(not_found)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": WELCOME_MESSAGE }))
}

async fn missing_video_id() -> ApiError {
    ApiError::empty_video_id()
}

async fn not_found() -> ApiError {
    ApiError::route_not_found()
}

async fn get_transcript(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    let Path(video_id) = path.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let header_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    // Flag errors are only reported to authorized callers.
    let raw: HashMap<String, String> = Query::try_from_uri(&uri)
        .map(|Query(raw)| raw)
        .unwrap_or_default();

    admit(&state, &video_id, header_key, raw.get(API_KEY_QUERY).map(String::as_str))?;

    let query: Result<Query<TranscriptQuery>, QueryRejection> = Query::try_from_uri(&uri);
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let envelope = respond(
        &state,
        &video_id,
        query.lang.as_deref(),
        query.all_langs,
        query.plain_text,
    )
    .await?;

    Ok(Json(envelope))
}

/// Bind `addr` and serve until Ctrl-C or SIGTERM
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServiceError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    tracing::info!(
        keys = state.authorizer.key_count(),
        "Listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::KeySet;
    use crate::youtube::{CaptionTrack, FetchError, MockTranscriptSource};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    const KEY: &str = "my-secret-api-key-123";

    fn segments() -> Vec<TranscriptSegment> {
        vec![
            TranscriptSegment {
                text: "Hello".to_string(),
                start: 0.0,
                duration: 1.2,
            },
            TranscriptSegment {
                text: "world".to_string(),
                start: 1.2,
                duration: 0.8,
            },
        ]
    }

    /// Source that answers every call successfully
    fn happy_source() -> MockTranscriptSource {
        let mut source = MockTranscriptSource::new();
        source
            .expect_fetch_transcript()
            .returning(|_, _| Ok(segments()));
        source.expect_list_transcripts().returning(|_| {
            Ok(vec![CaptionTrack {
                name: "English".to_string(),
                language_code: "en".to_string(),
                is_generated: false,
                is_translatable: true,
                base_url: "https://www.youtube.com/api/timedtext?v=abc".to_string(),
            }])
        });
        source
    }

    fn app(source: MockTranscriptSource) -> Router {
        let state = AppState::new(
            Authorizer::new(KeySet::from_keys([KEY, "another-secret-key-456"])),
            TranscriptGateway::new(Arc::new(source), Duration::from_secs(5)),
        );
        router(Arc::new(state))
    }

    async fn send(app: Router, uri: &str, header_key: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(key) = header_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_root_needs_no_key() {
        let (status, body) = send(app(MockTranscriptSource::new()), "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_header_key_authorizes() {
        let (status, body) = send(app(happy_source()), "/transcript/abc", Some(KEY)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "transcript_content");
        assert_eq!(body["video_id"], "abc");
        assert_eq!(body["transcript"][0]["text"], "Hello");
        assert_eq!(body["transcript"][1]["start"], 1.2);
    }

    #[tokio::test]
    async fn test_missing_or_unknown_key_is_401() {
        let mut source = MockTranscriptSource::new();
        source.expect_fetch_transcript().never();
        source.expect_list_transcripts().never();
        let app = app(source);

        let (status, body) = send(app.clone(), "/transcript/abc", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body["detail"],
            "Invalid or missing API Key. Provide it in 'X-API-Key' header or 'api_key' query parameter."
        );

        let (status, _) = send(app.clone(), "/transcript/abc", Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(app, "/transcript/abc?api_key=wrong", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_header_beats_invalid_query() {
        let (status, _) = send(app(happy_source()), "/transcript/abc?api_key=wrong", Some(KEY)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_query_key_used_when_header_invalid() {
        let uri = format!("/transcript/abc?api_key={}", KEY);
        let (status, _) = send(app(happy_source()), &uri, Some("wrong")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_video_id_is_400_regardless_of_auth() {
        for uri in ["/transcript/", "/transcript", "/transcript/%20"] {
            let (status, body) = send(app(MockTranscriptSource::new()), uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["detail"], "Video ID cannot be empty.");

            let (status, _) = send(app(MockTranscriptSource::new()), uri, Some(KEY)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_all_langs_takes_precedence() {
        let uri = "/transcript/abc?all_langs=true&plain_text=true&lang=de";
        let (status, body) = send(app(happy_source()), uri, Some(KEY)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "available_languages");
        assert_eq!(body["language"], "de");
        assert_eq!(body["available_transcripts"][0]["language_code"], "en");
        assert_eq!(body["available_transcripts"][0]["is_generated"], false);
        assert!(body.get("transcript").is_none());
    }

    #[tokio::test]
    async fn test_plain_text_joins_segments() {
        let (status, body) = send(app(happy_source()), "/transcript/abc?plain_text=1", Some(KEY)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "plain_text_transcript");
        assert_eq!(body["transcript"], "Hello world");
    }

    #[tokio::test]
    async fn test_language_echo() {
        let (_, body) = send(app(happy_source()), "/transcript/abc", Some(KEY)).await;
        assert_eq!(body["language"], AUTO_DETECTED);

        let (_, body) = send(app(happy_source()), "/transcript/abc?lang=es", Some(KEY)).await;
        assert_eq!(body["language"], "es");
    }

    #[tokio::test]
    async fn test_disabled_is_403() {
        let mut source = MockTranscriptSource::new();
        source.expect_fetch_transcript().returning(|id, _| {
            Err(FetchError::TranscriptsDisabled {
                video_id: id.to_string(),
            })
        });

        let (status, body) = send(app(source), "/transcript/abc", Some(KEY)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "Transcripts are disabled for this video by the video owner.");
    }

    #[tokio::test]
    async fn test_no_transcript_is_404() {
        let mut source = MockTranscriptSource::new();
        source.expect_list_transcripts().returning(|id| {
            Err(FetchError::NoTranscriptAvailable {
                video_id: id.to_string(),
            })
        });

        let (status, body) = send(app(source), "/transcript/abc?all_langs=yes", Some(KEY)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["detail"],
            "No transcript found for this video in the specified language or any available language."
        );
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_500() {
        let mut source = MockTranscriptSource::new();
        source.expect_fetch_transcript().returning(|id, _| {
            Err(FetchError::TooManyRequests {
                video_id: id.to_string(),
            })
        });

        let (status, body) = send(app(source), "/transcript/abc", Some(KEY)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("Could not retrieve transcript."));
    }

    #[tokio::test]
    async fn test_invalid_flag_is_400() {
        let (status, body) = send(app(MockTranscriptSource::new()), "/transcript/abc?plain_text=maybe", Some(KEY)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_flag_without_key_is_401() {
        let (status, body) = send(app(MockTranscriptSource::new()), "/transcript/abc?plain_text=maybe", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid or missing API Key"));

        let (status, _) = send(
            app(MockTranscriptSource::new()),
            "/transcript/abc?all_langs=sometimes&api_key=wrong",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_flag_with_query_key_is_400() {
        let uri = format!("/transcript/abc?api_key={}&all_langs=maybe", KEY);
        let (status, body) = send(app(MockTranscriptSource::new()), &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_undecodable_video_id_is_json_400() {
        let (status, body) = send(app(MockTranscriptSource::new()), "/transcript/%FF", Some(KEY)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_handle_without_router() {
        let state = AppState::new(
            Authorizer::new(KeySet::from_keys([KEY])),
            TranscriptGateway::new(Arc::new(happy_source()), Duration::from_secs(5)),
        );

        let err = handle(&state, "  ", None, None, None, false, false).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = handle(&state, "abc", None, Some("wrong"), None, false, false).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let envelope = handle(&state, "abc", None, Some(KEY), Some("en"), false, true).await.unwrap();
        assert_eq!(envelope.video_id(), "abc");
        assert_eq!(envelope.language(), "en");
        assert!(matches!(envelope, ResponseEnvelope::PlainText { .. }));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = send(app(MockTranscriptSource::new()), "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Not Found");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("2"), None);
    }
}
