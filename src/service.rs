//! Boundary entry points: wraps the pipeline in result envelopes and serves
//! placeholder reels when provider credentials are missing.
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::model::{Article, Reel, ReelBatch, ScriptResult, VideoClip, REEL_DURATION_LABEL};
use crate::news::NewsApiClient;
use crate::pipeline::{BatchRequest, ReelPipeline};
use crate::script::GeminiScriptGenerator;
use crate::video::PexelsVideoFinder;
use crate::voice::ElevenLabsSynthesizer;

pub const PLACEHOLDER_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";
const PLACEHOLDER_MESSAGE: &str = "placeholder reel (API keys required for live generation)";

pub struct ReelService {
    pipeline: Option<ReelPipeline>,
}

impl ReelService {
    pub fn live(pipeline: ReelPipeline) -> Self {
        Self {
            pipeline: Some(pipeline),
        }
    }

    pub fn placeholder() -> Self {
        Self { pipeline: None }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        if !cfg.has_credentials() {
            warn!("provider credentials missing; serving placeholder reels");
            return Ok(Self::placeholder());
        }
        let pipeline = ReelPipeline::new(
            Arc::new(NewsApiClient::from_config(cfg)?),
            Arc::new(GeminiScriptGenerator::from_config(cfg)?),
            Arc::new(ElevenLabsSynthesizer::from_config(cfg)?),
            Arc::new(PexelsVideoFinder::from_config(cfg)?),
        )
        .with_limits(cfg.stage_limits());
        Ok(Self::live(pipeline))
    }

    pub fn is_live(&self) -> bool {
        self.pipeline.is_some()
    }

    pub async fn generate_batch(&self, req: &BatchRequest) -> Result<ReelBatch> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(ReelBatch::success(vec![placeholder_reel(&req.category)])
                .with_message(PLACEHOLDER_MESSAGE));
        };
        let reels = pipeline.generate(req).await?;
        info!(count = reels.len(), requested = req.count, "reel batch complete");
        Ok(ReelBatch::success(reels))
    }

    pub async fn generate_trending(&self, count: usize) -> Result<ReelBatch> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(ReelBatch::success(vec![placeholder_reel("trending")])
                .with_message(PLACEHOLDER_MESSAGE));
        };
        let reels = pipeline.trending(count).await?;
        info!(count = reels.len(), requested = count, "trending batch complete");
        Ok(ReelBatch::success(reels))
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn placeholder_reel(category: &str) -> Reel {
    let label = title_case(category);
    let narration = format!(
        "Today we bring you the latest {category} news and developments from around the world."
    );
    let article = Article {
        title: format!("{label} News Update"),
        description: format!("Latest {category} news and developments from around the world"),
        content: String::new(),
        url: String::new(),
        image_url: None,
        source: format!("{label} News"),
        author: None,
        published_at: None,
    };
    let script = ScriptResult {
        word_count: narration.split_whitespace().count(),
        script: narration.clone(),
        scene_cues: Vec::new(),
        narration,
        estimated_duration: REEL_DURATION_LABEL.to_string(),
    };
    let clip = VideoClip {
        id: 0,
        url: PLACEHOLDER_VIDEO_URL.to_string(),
        width: 0,
        height: 0,
        duration: 0,
        cue: category.to_string(),
        thumbnail: None,
        attribution: "Blender Foundation".to_string(),
        page_url: None,
    };
    Reel::assemble(article, script, None, vec![clip])
}
