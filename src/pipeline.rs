//! Article → script → voice → video orchestration.
//!
//! Stages run strictly one after another over the whole batch; items inside a
//! stage run concurrently under `StageLimits`. Per item, a failed script drops
//! the article, a failed voice-over keeps the reel without audio, and missing
//! clips are simply left out. An empty article batch is the only error that
//! reaches the caller.
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{ReelError, Result};
use crate::model::{Article, AudioAsset, Reel, ScriptResult};
use crate::news::NewsSource;
use crate::script::{self, ScriptGenerator};
use crate::stage::StageLimits;
use crate::video::{self, StockVideoFinder};
use crate::voice::{self, VoiceSynthesizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub category: String,
    pub country: String,
    pub count: usize,
}

#[derive(Clone)]
pub struct ReelPipeline {
    news: Arc<dyn NewsSource>,
    scripts: Arc<dyn ScriptGenerator>,
    voice: Arc<dyn VoiceSynthesizer>,
    video: Arc<dyn StockVideoFinder>,
    limits: StageLimits,
}

impl ReelPipeline {
    pub fn new(
        news: Arc<dyn NewsSource>,
        scripts: Arc<dyn ScriptGenerator>,
        voice: Arc<dyn VoiceSynthesizer>,
        video: Arc<dyn StockVideoFinder>,
    ) -> Self {
        Self {
            news,
            scripts,
            voice,
            video,
            limits: StageLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: StageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> StageLimits {
        self.limits
    }

    /// Reels for the top headlines of one category and country.
    #[instrument(skip(self), fields(category = %req.category, country = %req.country))]
    pub async fn generate(&self, req: &BatchRequest) -> Result<Vec<Reel>> {
        let articles = self
            .news
            .fetch_headlines(&req.category, &req.country, req.count)
            .await?;
        self.run(articles).await
    }

    /// Reels for the trending mix across categories.
    #[instrument(skip(self))]
    pub async fn trending(&self, count: usize) -> Result<Vec<Reel>> {
        let articles = self.news.fetch_trending(count).await?;
        self.run(articles).await
    }

    /// Run stages 2-5 over an acquired batch.
    pub async fn run(&self, articles: Vec<Article>) -> Result<Vec<Reel>> {
        if articles.is_empty() {
            return Err(ReelError::NotFound("no news articles found".into()));
        }
        info!(articles = articles.len(), "acquired articles");

        let scripted = self.script_stage(articles).await;
        if scripted.is_empty() {
            info!("no article produced a script");
            return Ok(Vec::new());
        }

        let voiced = self.voice_stage(scripted).await;

        let scripts: Vec<&ScriptResult> = voiced.iter().map(|(_, script, _)| script).collect();
        let clips = video::find_for_scripts(self.video.as_ref(), &scripts, self.limits).await;

        let reels: Vec<Reel> = voiced
            .into_iter()
            .zip(clips)
            .map(|((article, script, audio), videos)| {
                Reel::assemble(article, script, audio, videos)
            })
            .collect();
        info!(reels = reels.len(), "assembled reels");
        Ok(reels)
    }

    async fn script_stage(&self, articles: Vec<Article>) -> Vec<(Article, ScriptResult)> {
        script::generate_batch(self.scripts.as_ref(), articles, self.limits).await
    }

    async fn voice_stage(
        &self,
        scripted: Vec<(Article, ScriptResult)>,
    ) -> Vec<(Article, ScriptResult, Option<AudioAsset>)> {
        let scripts = scripted.iter().map(|(_, script)| script);
        let audio = voice::synthesize_batch(self.voice.as_ref(), scripts, self.limits).await;

        scripted
            .into_iter()
            .zip(audio)
            .map(|((article, script), audio)| (article, script, audio))
            .collect()
    }
}
