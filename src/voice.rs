use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{ReelError, Result};
use crate::http;
use crate::model::{AudioAsset, ScriptResult};
use crate::script::collapse_whitespace;
use crate::stage::{self, StageLimits};

pub const WORDS_PER_MINUTE: f64 = 150.0;

static SCENE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)scene\s*:").expect("valid scene marker regex"));

#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(&self, narration: &str) -> Result<AudioAsset>;
}

/// Normalize narration for text-to-speech: collapse whitespace, drop stray
/// scene markers and make sure the text ends with terminal punctuation.
pub fn prepare_text(narration: &str) -> Result<String> {
    let stripped = SCENE_MARKER.replace_all(narration, " ");
    let mut text = collapse_whitespace(&stripped);
    if text.is_empty() {
        return Err(ReelError::Synthesis("narration text is empty".into()));
    }
    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    Ok(text)
}

/// Spoken length in seconds at a fixed speaking rate, rounded to 2 places.
pub fn estimate_duration(text: &str) -> f64 {
    let words = text.split_whitespace().count() as f64;
    let seconds = words / WORDS_PER_MINUTE * 60.0;
    (seconds * 100.0).round() / 100.0
}

/// Writes synthesized audio under `<dir>` and hands out public locators.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
    public_prefix: String,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Same voice and text always map to the same file name.
    pub fn file_name(voice_id: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(voice_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("audio_{}.mp3", &digest[..16])
    }

    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(String, PathBuf)> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        let url = format!("{}/audio/{}", self.public_prefix.trim_end_matches('/'), file_name);
        Ok((url, path))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceInfo {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Clone)]
pub struct ElevenLabsSynthesizer {
    http: Client,
    base_url: Url,
    api_key: String,
    voice_id: String,
    model_id: String,
    settings: VoiceSettings,
    store: AudioStore,
}

impl fmt::Debug for ElevenLabsSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsSynthesizer")
            .field("base_url", &self.base_url)
            .field("voice_id", &self.voice_id)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl ElevenLabsSynthesizer {
    pub fn new(
        api_key: String,
        base_url: Url,
        voice_id: String,
        model_id: String,
        store: AudioStore,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: http::build_client(timeout)?,
            base_url,
            api_key,
            voice_id,
            model_id,
            settings: VoiceSettings::default(),
            store,
        })
    }

    pub fn with_settings(mut self, settings: VoiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let settings = VoiceSettings {
            stability: cfg.voice.stability,
            similarity_boost: cfg.voice.similarity_boost,
            style: cfg.voice.style,
            use_speaker_boost: cfg.voice.use_speaker_boost,
        };
        Ok(Self::new(
            cfg.voice.api_key.clone(),
            http::parse_base_url(&cfg.voice.base_url)?,
            cfg.voice.voice_id.clone(),
            cfg.voice.model_id.clone(),
            AudioStore::new(cfg.audio_dir(), cfg.app.public_prefix.clone()),
            cfg.request_timeout(),
        )?
        .with_settings(settings))
    }

    pub fn build_request(&self, text: &str) -> Result<reqwest::Request> {
        let endpoint = http::join(
            &self.base_url,
            &format!("v1/text-to-speech/{}", self.voice_id),
        )?;
        let body = TtsRequest {
            text,
            model_id: &self.model_id,
            voice_settings: &self.settings,
        };
        Ok(self
            .http
            .post(endpoint)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .build()?)
    }

    async fn request_audio(&self, text: &str) -> Result<Vec<u8>> {
        let request = self.build_request(text)?;
        debug!(url = %request.url(), chars = text.len(), "sending text-to-speech request");
        let res = self.http.execute(request).await?;
        let res = http::check_status(res, "elevenlabs").await?;
        let bytes = res.bytes().await?;
        if bytes.is_empty() {
            return Err(ReelError::Synthesis("provider returned no audio".into()));
        }
        Ok(bytes.to_vec())
    }

    pub async fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        let endpoint = http::join(&self.base_url, "v1/voices")?;
        let res = self
            .http
            .get(endpoint)
            .header("Accept", "application/json")
            .header("xi-api-key", &self.api_key)
            .send()
            .await?;
        let res = http::check_status(res, "elevenlabs").await?;
        let payload: VoicesResponse = res
            .json()
            .await
            .map_err(|e| ReelError::Upstream(format!("invalid voices response: {e}")))?;
        Ok(payload.voices)
    }
}

#[async_trait]
impl VoiceSynthesizer for ElevenLabsSynthesizer {
    #[instrument(skip_all)]
    async fn synthesize(&self, narration: &str) -> Result<AudioAsset> {
        let text = prepare_text(narration)?;
        let bytes = self.request_audio(&text).await.map_err(into_synthesis)?;

        let file_name = AudioStore::file_name(&self.voice_id, &text);
        let (url, path) = self
            .store
            .save(&file_name, &bytes)
            .await
            .map_err(into_synthesis)?;
        info!(%url, bytes = bytes.len(), "stored voice-over");

        Ok(AudioAsset {
            url,
            path: path.to_string_lossy().into_owned(),
            duration: estimate_duration(&text),
            voice_id: self.voice_id.clone(),
            text_length: text.chars().count(),
        })
    }
}

fn into_synthesis(err: ReelError) -> ReelError {
    match err {
        ReelError::Synthesis(_) => err,
        other => ReelError::Synthesis(other.to_string()),
    }
}

/// Synthesize every narration; one result per input, in input order.
#[instrument(skip_all)]
pub async fn synthesize_each<'a, I>(
    synthesizer: &dyn VoiceSynthesizer,
    narrations: I,
    limits: StageLimits,
) -> Vec<Result<AudioAsset>>
where
    I: IntoIterator<Item = &'a str>,
{
    stage::run_bounded("voice", narrations, limits, |text| synthesizer.synthesize(text)).await
}

/// Isolate-and-continue batch: a failed synthesis is logged and yields `None`
/// at its position.
pub async fn synthesize_batch<'a, I>(
    synthesizer: &dyn VoiceSynthesizer,
    scripts: I,
    limits: StageLimits,
) -> Vec<Option<AudioAsset>>
where
    I: IntoIterator<Item = &'a ScriptResult>,
{
    let narrations = scripts.into_iter().map(|s| s.narration.as_str());
    synthesize_each(synthesizer, narrations, limits)
        .await
        .into_iter()
        .map(|res| match res {
            Ok(asset) => Some(asset),
            Err(err) => {
                warn!(?err, "voice synthesis failed; keeping reel without audio");
                None
            }
        })
        .collect()
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceInfo>,
}
