use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{KeySource, DEFAULT_KEYS_ENV};

pub const DEFAULT_WATCH_URL: &str = "https://www.youtube.com/watch";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// API key settings
    pub auth: AuthConfig,

    /// YouTube client settings
    pub youtube: YoutubeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to bind
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding a comma-separated list of keys
    pub keys_env: String,

    /// Keys used when the environment variable is not set (development only)
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// Upper bound on one transcript lookup, in seconds
    pub fetch_timeout_secs: u64,

    /// Accept-Language header sent to YouTube
    pub accept_language: String,

    /// User-Agent header sent to YouTube
    pub user_agent: String,

    /// Watch page endpoint, `?v=<id>` is appended
    pub watch_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keys_env: DEFAULT_KEYS_ENV.to_string(),
            keys: Vec::new(),
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            accept_language: "en-US".to_string(),
            user_agent: concat!("yt-transcript-service/", env!("CARGO_PKG_VERSION")).to_string(),
            watch_url: DEFAULT_WATCH_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::existing_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the default location, returning the path written
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn existing_config_path() -> Option<PathBuf> {
        Self::config_path().ok().filter(|path| path.exists())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcript-service").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }

        if self.youtube.fetch_timeout_secs == 0 {
            anyhow::bail!("youtube.fetch_timeout_secs must be non-zero");
        }

        url::Url::parse(&self.youtube.watch_url)
            .with_context(|| format!("Invalid youtube.watch_url: {}", self.youtube.watch_url))?;

        if self.auth.keys_env.trim().is_empty() {
            anyhow::bail!("auth.keys_env must name an environment variable");
        }

        self.bind_addr()?;
        Ok(())
    }

    /// Socket address the server listens on
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid server.host: {}", self.server.host))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.youtube.fetch_timeout_secs)
    }

    /// Where API keys come from for this configuration
    pub fn key_source(&self) -> KeySource {
        KeySource::resolve(&self.auth.keys_env, &self.auth.keys)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen Address: {}:{}", self.server.host, self.server.port);
        println!("  API Keys Env: {}", self.auth.keys_env);
        println!("  Static API Keys: {}", self.auth.keys.len());
        println!("  Fetch Timeout: {}s", self.youtube.fetch_timeout_secs);
        println!("  Accept-Language: {}", self.youtube.accept_language);
        println!("  Watch URL: {}", self.youtube.watch_url);
    }
}
