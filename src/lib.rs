//! YouTube Transcript Service - An API-key protected HTTP service for YouTube transcripts
//!
//! This library provides the building blocks of the service: API key loading and
//! authorization, a YouTube caption client, the transcript gateway that shapes its
//! results, and the axum router that exposes everything over HTTP.

pub mod auth;
pub mod cli;
pub mod config;
pub mod output;
pub mod server;
pub mod transcript;
pub mod utils;
pub mod youtube;

pub use auth::{ApiKey, AuthError, Authorizer, KeySet, KeySource};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use server::{ApiError, AppState, ResponseEnvelope};
pub use transcript::{GatewayError, LanguageDescriptor, Mode, TranscriptGateway, TranscriptRequest, TranscriptSegment};
pub use youtube::{FetchError, TranscriptSource, YoutubeTranscriptSource};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types raised while bringing the service up
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}
