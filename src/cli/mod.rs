use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "transcript-server",
    about = "YouTube Transcript Service - Fetch YouTube transcripts over an API-key protected HTTP API",
    version,
    long_about = "An HTTP service that returns the transcripts of YouTube videos as JSON. Callers authenticate with a shared API key sent in the X-API-Key header or the api_key query parameter."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to bind (overrides the config file)
        #[arg(long, env = "TRANSCRIPT_HOST", value_name = "ADDR")]
        host: Option<String>,

        /// Port to bind (overrides the config file)
        #[arg(short, long, env = "TRANSCRIPT_PORT", value_name = "PORT")]
        port: Option<u16>,

        /// Timeout for one transcript lookup in seconds (overrides the config file)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Fetch one transcript without starting the server
    Fetch {
        /// YouTube video id (e.g. dQw4w9WgXcQ)
        #[arg(value_name = "VIDEO_ID")]
        video_id: String,

        /// Preferred language code (auto-detect if not specified)
        #[arg(short, long, value_name = "LANG")]
        lang: Option<String>,

        /// List available transcript languages instead of fetching one
        #[arg(long)]
        all_langs: bool,

        /// Join the transcript into a single block of text
        #[arg(long)]
        plain_text: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Pretty-printed JSON envelope
    Json,
    /// Human readable text
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}
