use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::transcript::GatewayError;

/// An HTTP failure rendered as `{"detail": ...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn empty_video_id() -> Self {
        Self::bad_request("Video ID cannot be empty.")
    }

    pub fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.detail)
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoTranscriptFound => Self::new(
                StatusCode::NOT_FOUND,
                "No transcript found for this video in the specified language or any available language.",
            ),
            GatewayError::TranscriptsDisabled => Self::new(
                StatusCode::FORBIDDEN,
                "Transcripts are disabled for this video by the video owner.",
            ),
            GatewayError::RetrievalFailed(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not retrieve transcript. This may be due to a temporary issue with YouTube or aggressive scraping detection.",
            ),
            GatewayError::Unknown(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An unexpected server error occurred: {}", message),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.detail);
        }

        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_mapping() {
        assert_eq!(ApiError::from(GatewayError::NoTranscriptFound).status, StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(GatewayError::TranscriptsDisabled).status, StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(GatewayError::RetrievalFailed("blocked".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unknown_keeps_message() {
        let err = ApiError::from(GatewayError::Unknown("connection reset".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail, "An unexpected server error occurred: connection reset");
    }

    #[test]
    fn test_auth_maps_to_401() {
        let err = ApiError::from(AuthError::Unauthorized);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert!(err.detail.contains("X-API-Key"));
    }
}
