use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{ReelError, Result};
use crate::http;
use crate::model::{ScriptResult, VideoClip};
use crate::stage::{self, StageLimits};

/// Renditions at least this wide are preferred.
pub const HD_MIN_WIDTH: u32 = 1280;

pub const GENERIC_CUES: [&str; 6] = [
    "news broadcast",
    "city skyline",
    "people walking",
    "technology",
    "business meeting",
    "nature landscape",
];
pub const FALLBACK_CUE_COUNT: usize = 3;

#[async_trait]
pub trait StockVideoFinder: Send + Sync {
    /// `Ok(None)` when the provider has nothing for the cue.
    async fn find_for_cue(&self, cue: &str) -> Result<Option<VideoClip>>;
}

pub fn fallback_cues<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    GENERIC_CUES
        .choose_multiple(rng, FALLBACK_CUE_COUNT)
        .map(|cue| cue.to_string())
        .collect()
}

fn cues_for(script: &ScriptResult) -> Vec<String> {
    if script.scene_cues.is_empty() {
        fallback_cues(&mut rand::thread_rng())
    } else {
        script.scene_cues.clone()
    }
}

/// Look up one clip per scene cue, keeping cue order. Cues that fail or match
/// nothing are skipped, so the result may be shorter than the cue list.
pub async fn find_for_script(
    finder: &dyn StockVideoFinder,
    script: &ScriptResult,
    limits: StageLimits,
) -> Vec<VideoClip> {
    find_for_scripts(finder, &[script], limits)
        .await
        .into_iter()
        .next()
        .unwrap_or_default()
}

/// `find_for_script` over many scripts at once. All cue lookups share one
/// bounded run, so `limits` caps the total number of calls in flight.
#[instrument(skip_all, fields(scripts = scripts.len()))]
pub async fn find_for_scripts(
    finder: &dyn StockVideoFinder,
    scripts: &[&ScriptResult],
    limits: StageLimits,
) -> Vec<Vec<VideoClip>> {
    let lookups: Vec<(usize, String)> = scripts
        .iter()
        .enumerate()
        .flat_map(|(i, script)| cues_for(script).into_iter().map(move |cue| (i, cue)))
        .collect();
    let results = stage::run_bounded("video", lookups.iter(), limits, |(_, cue)| {
        finder.find_for_cue(cue)
    })
    .await;

    let mut clips = vec![Vec::new(); scripts.len()];
    for ((i, cue), res) in lookups.iter().zip(results) {
        match res {
            Ok(Some(clip)) => clips[*i].push(clip),
            Ok(None) => debug!(%cue, "no stock video for cue"),
            Err(err) => warn!(?err, %cue, "stock video lookup failed; skipping cue"),
        }
    }
    clips
}

#[derive(Clone)]
pub struct PexelsVideoFinder {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for PexelsVideoFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PexelsVideoFinder")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PexelsVideoFinder {
    pub fn new(api_key: String, base_url: Url, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http::build_client(timeout)?,
            base_url,
            api_key,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.video.api_key.clone(),
            http::parse_base_url(&cfg.video.base_url)?,
            cfg.request_timeout(),
        )
    }

    pub fn build_request(&self, cue: &str) -> Result<reqwest::Request> {
        let endpoint = http::join(&self.base_url, "videos/search")?;
        Ok(self
            .http
            .get(endpoint)
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", cue),
                ("per_page", "1"),
                ("orientation", "portrait"),
                ("size", "medium"),
            ])
            .build()?)
    }
}

#[async_trait]
impl StockVideoFinder for PexelsVideoFinder {
    async fn find_for_cue(&self, cue: &str) -> Result<Option<VideoClip>> {
        let request = self.build_request(cue)?;
        debug!(url = %request.url(), "sending video search request");
        let res = self.http.execute(request).await?;
        let res = http::check_status(res, "pexels").await?;
        let payload: SearchResponse = res
            .json()
            .await
            .map_err(|e| ReelError::Upstream(format!("invalid pexels response: {e}")))?;
        Ok(payload
            .videos
            .into_iter()
            .next()
            .and_then(|video| into_clip(video, cue)))
    }
}

/// First rendition at least `HD_MIN_WIDTH` wide, else the first one listed.
fn select_rendition(files: &[RawVideoFile]) -> Option<&RawVideoFile> {
    files
        .iter()
        .find(|f| f.width.unwrap_or(0) >= HD_MIN_WIDTH)
        .or_else(|| files.first())
}

fn into_clip(video: RawVideo, cue: &str) -> Option<VideoClip> {
    let file = select_rendition(&video.video_files)?;
    Some(VideoClip {
        id: video.id,
        url: file.link.clone(),
        width: file.width.unwrap_or(0),
        height: file.height.unwrap_or(0),
        duration: video.duration.unwrap_or(0),
        cue: cue.to_string(),
        thumbnail: video.image.clone(),
        attribution: video
            .user
            .as_ref()
            .and_then(|u| u.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        page_url: video.url.clone(),
    })
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<RawVideo>,
}

#[derive(Deserialize)]
struct RawVideo {
    id: u64,
    url: Option<String>,
    image: Option<String>,
    duration: Option<u32>,
    user: Option<RawUser>,
    #[serde(default)]
    video_files: Vec<RawVideoFile>,
}

#[derive(Deserialize)]
struct RawUser {
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawVideoFile {
    link: String,
    width: Option<u32>,
    height: Option<u32>,
}
