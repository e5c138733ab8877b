use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use news_reels::config;
use news_reels::model::Article;
use news_reels::news::{NewsApiClient, NewsSource};
use news_reels::pipeline::BatchRequest;
use news_reels::script::{GeminiScriptGenerator, ScriptGenerator};
use news_reels::service::ReelService;
use news_reels::stage;
use news_reels::video::{PexelsVideoFinder, StockVideoFinder};
use news_reels::voice::{ElevenLabsSynthesizer, VoiceSynthesizer};

#[derive(Debug, Parser)]
#[command(author, version, about = "Turn news headlines into short video reels")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate reels for the top headlines of a category
    Generate {
        #[arg(long, default_value = "general")]
        category: String,
        /// Defaults to `news.country` from the config
        #[arg(long)]
        country: Option<String>,
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Generate reels from the trending mix across categories
    Trending {
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Print headlines without generating reels
    Headlines {
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long)]
        country: Option<String>,
        /// Keyword search instead of top headlines
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Write a reel script for one story
    Script {
        #[arg(long)]
        title: String,
        /// Story text handed to the model
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, default_value = "")]
        url: String,
    },
    /// Synthesize narration audio for a piece of text
    Speak {
        #[arg(long)]
        text: String,
    },
    /// Look up one stock video per scene cue
    Videos {
        #[arg(long = "cue", required = true)]
        cues: Vec<String>,
    },
    /// List the voices available for narration
    Voices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    match args.command {
        Command::Generate {
            category,
            country,
            count,
        } => {
            let service = ReelService::from_config(&cfg)?;
            let req = BatchRequest {
                category,
                country: country.unwrap_or_else(|| cfg.news.country.clone()),
                count,
            };
            info!(
                category = %req.category,
                country = %req.country,
                count,
                live = service.is_live(),
                "generating reels"
            );
            print_json(&service.generate_batch(&req).await?)?;
        }
        Command::Trending { count } => {
            let service = ReelService::from_config(&cfg)?;
            info!(count, live = service.is_live(), "generating trending reels");
            print_json(&service.generate_trending(count).await?)?;
        }
        Command::Headlines {
            category,
            country,
            query,
            count,
        } => {
            require_key(&cfg.news.api_key, "news.api_key")?;
            let client = NewsApiClient::from_config(&cfg)?;
            let articles = match query {
                Some(q) => client.search(&q, count).await?,
                None => {
                    let country = country.unwrap_or_else(|| cfg.news.country.clone());
                    client.fetch_headlines(&category, &country, count).await?
                }
            };
            print_json(&json!({ "count": articles.len(), "articles": articles }))?;
        }
        Command::Script {
            title,
            content,
            url,
        } => {
            require_key(&cfg.script.api_key, "script.api_key")?;
            let article = Article {
                title,
                description: content,
                content: String::new(),
                url,
                image_url: None,
                source: "cli".to_string(),
                author: None,
                published_at: None,
            };
            let script = GeminiScriptGenerator::from_config(&cfg)?
                .generate(&article)
                .await?;
            print_json(&script)?;
        }
        Command::Speak { text } => {
            require_key(&cfg.voice.api_key, "voice.api_key")?;
            let asset = ElevenLabsSynthesizer::from_config(&cfg)?
                .synthesize(&text)
                .await?;
            print_json(&asset)?;
        }
        Command::Videos { cues } => {
            require_key(&cfg.video.api_key, "video.api_key")?;
            let finder = PexelsVideoFinder::from_config(&cfg)?;
            let found = stage::run_bounded("video", &cues, cfg.stage_limits(), |cue| {
                finder.find_for_cue(cue)
            })
            .await;
            let mut videos = Vec::new();
            for (cue, res) in cues.iter().zip(found) {
                match res? {
                    Some(clip) => videos.push(clip),
                    None => info!(%cue, "no stock video for cue"),
                }
            }
            print_json(&json!({ "count": videos.len(), "videos": videos }))?;
        }
        Command::Voices => {
            require_key(&cfg.voice.api_key, "voice.api_key")?;
            let voices = ElevenLabsSynthesizer::from_config(&cfg)?.list_voices().await?;
            print_json(&json!({ "count": voices.len(), "voices": voices }))?;
        }
    }

    Ok(())
}

fn require_key(key: &str, name: &str) -> Result<()> {
    if key.trim().is_empty() {
        bail!("{name} is required for this command");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
