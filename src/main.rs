use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcript_service::auth::{load_keys, Authorizer};
use yt_transcript_service::cli::{Cli, Commands};
use yt_transcript_service::config::Config;
use yt_transcript_service::server::{self, ApiError, AppState, ResponseEnvelope};
use yt_transcript_service::transcript::{Mode, TranscriptGateway, TranscriptRequest};
use yt_transcript_service::youtube::YoutubeTranscriptSource;
use yt_transcript_service::{output, ServiceError};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "yt_transcript_service=debug,transcript_server=debug"
    } else {
        "yt_transcript_service=info,transcript_server=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve { host, port, timeout } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(timeout) = timeout {
                config.youtube.fetch_timeout_secs = timeout;
            }
            config
                .validate()
                .map_err(|e| ServiceError::InvalidConfig(e.to_string()))?;

            let keys = load_keys(&config.key_source());
            let state = AppState::new(Authorizer::new(keys), build_gateway(&config)?);

            server::serve(state, config.bind_addr()?).await?;
        }
        Commands::Fetch {
            video_id,
            lang,
            all_langs,
            plain_text,
            format,
        } => {
            let gateway = build_gateway(&config)?;
            let request = TranscriptRequest::new(&video_id, lang.as_deref(), Mode::select(all_langs, plain_text))
                .ok_or_else(ApiError::empty_video_id)?;

            let payload = gateway
                .execute(&request)
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to fetch transcript for {}", request.video_id()))?;

            let envelope = ResponseEnvelope::new(&request, payload);
            tracing::info!("Fetched {} ({})", envelope.video_id(), envelope.language());
            output::print_to_console(&envelope, &format)?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = config.save()?;
                println!("Configuration written to: {}", path.display());
            }
        }
    }

    Ok(())
}

fn build_gateway(config: &Config) -> Result<TranscriptGateway> {
    let source = YoutubeTranscriptSource::new(&config.youtube).map_err(ServiceError::from)?;
    Ok(TranscriptGateway::new(Arc::new(source), config.fetch_timeout()))
}
