use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{ReelError, Result};
use crate::http;
use crate::model::{Article, ScriptResult, REEL_DURATION_LABEL};
use crate::stage::{self, StageLimits};

/// A `Scene:` or `Narrator:` label at the start of a line, tolerating the
/// markdown emphasis and list markers models like to add around it.
static LINE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[\s*_#>\-]*(scene|narrator)[\s*_]*:[\s*_]*(.*)$")
        .expect("valid label regex")
});
/// A `Scene:` label in the middle of a line.
static INLINE_SCENE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bscene[\s*_]*:").expect("valid inline scene regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, article: &Article) -> Result<ScriptResult>;
}

pub fn build_prompt(title: &str, content: &str, url: &str) -> String {
    format!(
        "Write a one-minute (150-160 words) short-form video script about this news story.\n\
         \n\
         Title: {title}\n\
         Content: {content}\n\
         Source: {url}\n\
         \n\
         Format rules:\n\
         - Exactly four blocks, each a \"Narrator:\" line followed by a \"Scene:\" line.\n\
         - \"Narrator:\" lines hold the spoken voice-over only.\n\
         - \"Scene:\" lines hold a short stock-footage search phrase for the background video.\n\
         - Blocks, in order: opening hook (15s), main story (30s), key details (30s), closing (15s).\n\
         \n\
         Narrator: [opening hook]\n\
         Scene: [visual for the opening]\n\
         \n\
         Narrator: [main story]\n\
         Scene: [visual for the main story]\n\
         \n\
         Narrator: [key details]\n\
         Scene: [visual for the details]\n\
         \n\
         Narrator: [closing line]\n\
         Scene: [visual for the closing]\n\
         \n\
         Keep it factual, engaging and focused on what matters most in the story."
    )
}

/// Build a `ScriptResult` from raw model output.
pub fn parse_script(raw: &str) -> Result<ScriptResult> {
    let script = raw.trim();
    if script.is_empty() {
        return Err(ReelError::Generation("model returned empty output".into()));
    }
    Ok(ScriptResult {
        script: script.to_string(),
        scene_cues: extract_scene_cues(script),
        narration: extract_narration(script),
        word_count: script.split_whitespace().count(),
        estimated_duration: REEL_DURATION_LABEL.to_string(),
    })
}

enum Line<'a> {
    Scene(&'a str),
    Narrator(&'a str),
    Blank,
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Blank;
    }
    match LINE_LABEL.captures(line) {
        Some(caps) => {
            let (Some(label), Some(rest)) = (caps.get(1), caps.get(2)) else {
                return Line::Text(line.trim());
            };
            let rest = strip_placeholder_brackets(rest.as_str());
            if label.as_str().eq_ignore_ascii_case("scene") {
                Line::Scene(rest)
            } else {
                Line::Narrator(rest)
            }
        }
        None => Line::Text(line.trim()),
    }
}

fn strip_placeholder_brackets(s: &str) -> &str {
    let s = s.trim().trim_end_matches(['*', '_']).trim();
    match s.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')) {
        Some(inner) => inner.trim(),
        None => s,
    }
}

/// Split `text` at an inline `Scene:` label into the spoken part and the cue.
fn split_inline_scene(text: &str) -> (&str, Option<&str>) {
    match INLINE_SCENE.find(text) {
        Some(m) => {
            let spoken = text[..m.start()].trim_end().trim_end_matches(['*', '_']);
            let cue = text[m.end()..].trim_start_matches(|c: char| c == '*' || c == '_');
            (spoken.trim_end(), Some(strip_placeholder_brackets(cue)))
        }
        None => (text, None),
    }
}

/// Scene cues in script order; label matching ignores case. A cue may also
/// trail narration on the same line.
pub fn extract_scene_cues(script: &str) -> Vec<String> {
    script
        .lines()
        .filter_map(|line| match classify(line) {
            Line::Scene(cue) => Some(cue),
            Line::Narrator(text) | Line::Text(text) => split_inline_scene(text).1,
            Line::Blank => None,
        })
        .filter(|cue| !cue.is_empty())
        .map(str::to_string)
        .collect()
}

/// All narrator segments joined with collapsed whitespace. A segment runs
/// from its label to the next blank line, scene label or narrator label.
/// Without any narrator label the whole script is used.
pub fn extract_narration(script: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in script.lines() {
        match classify(line) {
            Line::Narrator(text) => {
                segments.extend(current.take());
                let (spoken, cue) = split_inline_scene(text);
                if cue.is_some() {
                    segments.push(spoken.to_string());
                } else {
                    current = Some(spoken.to_string());
                }
            }
            Line::Scene(_) | Line::Blank => segments.extend(current.take()),
            Line::Text(text) => {
                let (spoken, cue) = split_inline_scene(text);
                if let Some(segment) = current.as_mut() {
                    segment.push(' ');
                    segment.push_str(spoken);
                    if cue.is_some() {
                        segments.extend(current.take());
                    }
                }
            }
        }
    }
    segments.extend(current);

    let joined = collapse_whitespace(&segments.join(" "));
    if joined.is_empty() {
        return script.trim().to_string();
    }
    joined
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Run generation for every article, returning each outcome next to its article.
#[instrument(skip_all, fields(articles = articles.len()))]
pub async fn generate_each(
    generator: &dyn ScriptGenerator,
    articles: Vec<Article>,
    limits: StageLimits,
) -> Vec<(Article, Result<ScriptResult>)> {
    let results = stage::run_bounded("script", articles.iter(), limits, |article| {
        generator.generate(article)
    })
    .await;
    articles.into_iter().zip(results).collect()
}

/// Isolate-and-continue batch: failed articles are logged and left out.
pub async fn generate_batch(
    generator: &dyn ScriptGenerator,
    articles: Vec<Article>,
    limits: StageLimits,
) -> Vec<(Article, ScriptResult)> {
    generate_each(generator, articles, limits)
        .await
        .into_iter()
        .filter_map(|(article, res)| match res {
            Ok(script) => Some((article, script)),
            Err(err) => {
                warn!(?err, title = %article.title, "script generation failed; dropping article");
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct GeminiScriptGenerator {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiScriptGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiScriptGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiScriptGenerator {
    pub fn new(api_key: String, base_url: Url, model: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http::build_client(timeout)?,
            base_url,
            api_key,
            model,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.script.api_key.clone(),
            http::parse_base_url(&cfg.script.base_url)?,
            cfg.script.model.clone(),
            cfg.request_timeout(),
        )
    }

    pub fn build_request(&self, prompt: &str) -> Result<reqwest::Request> {
        let endpoint = http::join(
            &self.base_url,
            &format!("v1beta/models/{}:generateContent", self.model),
        )?;
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        Ok(self
            .http
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .build()?)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt)?;
        debug!(url = %request.url(), "sending generateContent request");
        let res = self.http.execute(request).await?;
        let res = http::check_status(res, "gemini").await?;
        let payload: GenerateResponse = res
            .json()
            .await
            .map_err(|e| ReelError::Upstream(format!("invalid gemini response: {e}")))?;

        Ok(payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl ScriptGenerator for GeminiScriptGenerator {
    #[instrument(skip_all, fields(title = %article.title))]
    async fn generate(&self, article: &Article) -> Result<ScriptResult> {
        let content = if article.description.trim().is_empty() {
            &article.content
        } else {
            &article.description
        };
        let prompt = build_prompt(&article.title, content, &article.url);
        let raw = self.complete(&prompt).await?;
        parse_script(&raw)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}
