//! Configuration loader and validator for the reel generator.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::stage::StageLimits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    pub news: News,
    pub script: Script,
    pub voice: Voice,
    pub video: Video,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub output_dir: String,
    pub public_prefix: String,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
}

/// Headline provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct News {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub country: String,
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Script {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Voice {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
    #[serde(default)]
    pub style: f32,
    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,
}

/// Stock video provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
}

fn default_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.75
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Ensure the audio output directory (`<output_dir>/audio`) exists.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.audio_dir())
    }

    pub fn audio_dir(&self) -> PathBuf {
        Path::new(&self.app.output_dir).join("audio")
    }

    /// False when any provider key is blank; the service then serves
    /// placeholder reels instead of running the pipeline.
    pub fn has_credentials(&self) -> bool {
        [
            &self.news.api_key,
            &self.script.api_key,
            &self.voice.api_key,
            &self.video.api_key,
        ]
        .iter()
        .all(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_secs)
    }

    pub fn stage_limits(&self) -> StageLimits {
        StageLimits::new(self.app.concurrency, self.request_timeout())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.output_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.output_dir must be non-empty"));
    }
    if cfg.app.public_prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("app.public_prefix must be non-empty"));
    }
    if cfg.app.concurrency == 0 {
        return Err(ConfigError::Invalid("app.concurrency must be > 0"));
    }
    if cfg.app.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("app.request_timeout_secs must be > 0"));
    }

    if cfg.news.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("news.base_url must be non-empty"));
    }
    if cfg.news.country.trim().is_empty() {
        return Err(ConfigError::Invalid("news.country must be non-empty"));
    }

    if cfg.script.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("script.base_url must be non-empty"));
    }
    if cfg.script.model.trim().is_empty() {
        return Err(ConfigError::Invalid("script.model must be non-empty"));
    }

    if cfg.voice.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("voice.base_url must be non-empty"));
    }
    if cfg.voice.voice_id.trim().is_empty() {
        return Err(ConfigError::Invalid("voice.voice_id must be non-empty"));
    }
    if cfg.voice.model_id.trim().is_empty() {
        return Err(ConfigError::Invalid("voice.model_id must be non-empty"));
    }

    if cfg.video.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("video.base_url must be non-empty"));
    }

    Ok(())
}

/// Returns a complete example YAML document.
pub fn example() -> &'static str {
    r#"app:
  output_dir: "./static"
  public_prefix: "/static"
  concurrency: 4
  request_timeout_secs: 30

news:
  api_key: "YOUR_NEWSAPI_KEY"
  base_url: "https://newsapi.org/"
  country: "us"

script:
  api_key: "YOUR_GEMINI_API_KEY"
  base_url: "https://generativelanguage.googleapis.com/"
  model: "gemini-pro"

voice:
  api_key: "YOUR_ELEVENLABS_API_KEY"
  base_url: "https://api.elevenlabs.io/"
  voice_id: "21m00Tcm4TlvDq8ikWAM"
  model_id: "eleven_monolingual_v1"
  stability: 0.5
  similarity_boost: 0.75
  style: 0.0
  use_speaker_boost: true

video:
  api_key: "YOUR_PEXELS_API_KEY"
  base_url: "https://api.pexels.com/"
"#
}
