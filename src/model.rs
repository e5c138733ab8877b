use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display duration attached to every script and reel.
pub const REEL_DURATION_LABEL: &str = "60 seconds";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image_url: Option<String>,
    pub source: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptResult {
    pub script: String,
    pub scene_cues: Vec<String>,
    pub narration: String,
    pub word_count: usize,
    pub estimated_duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioAsset {
    pub url: String,
    pub path: String,
    /// Seconds, from the fixed speaking-rate model rather than the provider.
    pub duration: f64,
    pub voice_id: String,
    pub text_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoClip {
    pub id: u64,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub duration: u32,
    pub cue: String,
    pub thumbnail: Option<String>,
    pub attribution: String,
    pub page_url: Option<String>,
}

/// Flattened view of a reel for players.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReelData {
    pub title: String,
    pub description: String,
    pub script: String,
    pub audio_url: Option<String>,
    pub video_urls: Vec<String>,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reel {
    pub id: String,
    pub article: Article,
    pub script: ScriptResult,
    pub audio: Option<AudioAsset>,
    pub videos: Vec<VideoClip>,
    pub reel_data: ReelData,
}

impl Reel {
    pub fn assemble(
        article: Article,
        script: ScriptResult,
        audio: Option<AudioAsset>,
        videos: Vec<VideoClip>,
    ) -> Self {
        let reel_data = ReelData {
            title: article.title.clone(),
            description: article.description.clone(),
            script: script.script.clone(),
            audio_url: audio.as_ref().map(|a| a.url.clone()),
            video_urls: videos.iter().map(|v| v.url.clone()).collect(),
            duration: script.estimated_duration.clone(),
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            article,
            script,
            audio,
            videos,
            reel_data,
        }
    }

    pub fn audio_url(&self) -> Option<&str> {
        self.reel_data.audio_url.as_deref()
    }

    pub fn video_urls(&self) -> &[String] {
        &self.reel_data.video_urls
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Success => "success",
        }
    }
}

/// Result envelope returned by both entry points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReelBatch {
    pub reels: Vec<Reel>,
    pub count: usize,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReelBatch {
    pub fn success(reels: Vec<Reel>) -> Self {
        Self {
            count: reels.len(),
            reels,
            status: BatchStatus::Success,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article {
            title: "Chip exports rise".into(),
            description: "Shipments up 12%".into(),
            content: "Full story".into(),
            url: "https://news.example/chips".into(),
            image_url: None,
            source: "Example Wire".into(),
            author: None,
            published_at: None,
        }
    }

    fn script() -> ScriptResult {
        ScriptResult {
            script: "Narrator: hi\nScene: factory floor".into(),
            scene_cues: vec!["factory floor".into()],
            narration: "hi".into(),
            word_count: 5,
            estimated_duration: REEL_DURATION_LABEL.into(),
        }
    }

    #[test]
    fn reel_data_without_audio_serializes_null_audio_url() {
        let reel = Reel::assemble(article(), script(), None, vec![]);
        let json = serde_json::to_value(&reel).unwrap();
        assert!(json["reel_data"]["audio_url"].is_null());
        assert_eq!(json["reel_data"]["title"], "Chip exports rise");
        assert_eq!(json["reel_data"]["duration"], "60 seconds");
    }

    #[test]
    fn envelope_shape() {
        let batch = ReelBatch::success(vec![Reel::assemble(article(), script(), None, vec![])]);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["status"], "success");
        assert!(json.get("message").is_none());
    }
}
