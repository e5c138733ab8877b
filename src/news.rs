use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{ReelError, Result};
use crate::http;
use crate::model::Article;

pub const TRENDING_CATEGORIES: [&str; 5] =
    ["technology", "business", "entertainment", "sports", "science"];
/// Articles requested from each category when building the trending list.
pub const TRENDING_SLICE: usize = 2;
pub const DEFAULT_COUNTRY: &str = "us";

#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_headlines(
        &self,
        category: &str,
        country: &str,
        page_size: usize,
    ) -> Result<Vec<Article>>;

    async fn fetch_trending(&self, page_size: usize) -> Result<Vec<Article>> {
        Ok(aggregate_trending(self, DEFAULT_COUNTRY, page_size).await)
    }
}

/// Merge a small slice of every trending category, newest first.
///
/// A failing category is logged and skipped; if all of them fail the result
/// is simply empty.
#[instrument(skip(source))]
pub async fn aggregate_trending<S>(source: &S, country: &str, page_size: usize) -> Vec<Article>
where
    S: NewsSource + ?Sized,
{
    let fetches = TRENDING_CATEGORIES.iter().map(|category| async move {
        let res = source
            .fetch_headlines(category, country, TRENDING_SLICE)
            .await;
        (*category, res)
    });

    let mut merged = Vec::new();
    let mut failed = 0;
    for (category, res) in join_all(fetches).await {
        match res {
            Ok(articles) => merged.extend(articles),
            Err(err) => {
                failed += 1;
                warn!(?err, category, "skipping trending category");
            }
        }
    }
    if failed == TRENDING_CATEGORIES.len() {
        warn!("every trending category failed; returning no articles");
    }

    // `None` sorts before `Some`, so undated articles end up last.
    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged.truncate(page_size);
    merged
}

#[derive(Clone)]
pub struct NewsApiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    country: String,
}

impl fmt::Debug for NewsApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsApiClient")
            .field("base_url", &self.base_url)
            .field("country", &self.country)
            .finish_non_exhaustive()
    }
}

impl NewsApiClient {
    pub fn new(api_key: String, base_url: Url, country: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http::build_client(timeout)?,
            base_url,
            api_key,
            country,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.news.api_key.clone(),
            http::parse_base_url(&cfg.news.base_url)?,
            cfg.news.country.clone(),
            cfg.request_timeout(),
        )
    }

    /// Keyword search over all indexed articles, newest first.
    pub async fn search(&self, keyword: &str, page_size: usize) -> Result<Vec<Article>> {
        let endpoint = http::join(&self.base_url, "v2/everything")?;
        let page_size = page_size.to_string();
        let query = [
            ("q", keyword),
            ("pageSize", page_size.as_str()),
            ("sortBy", "publishedAt"),
            ("language", "en"),
        ];
        self.get_articles(endpoint, &query).await
    }

    async fn get_articles(&self, endpoint: Url, query: &[(&str, &str)]) -> Result<Vec<Article>> {
        debug!(url = %endpoint, "sending newsapi request");
        let res = self
            .http
            .get(endpoint)
            .header("X-Api-Key", &self.api_key)
            .query(query)
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        let payload: ArticlesResponse = serde_json::from_str(&body).map_err(|e| {
            ReelError::Upstream(format!("newsapi returned {status} with invalid payload: {e}"))
        })?;

        if !status.is_success() || payload.status != "ok" {
            return Err(ReelError::Upstream(format!(
                "newsapi error {}: {}",
                status,
                payload.message.as_deref().unwrap_or("unknown error")
            )));
        }
        Ok(into_articles(payload.articles))
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch_headlines(
        &self,
        category: &str,
        country: &str,
        page_size: usize,
    ) -> Result<Vec<Article>> {
        let endpoint = http::join(&self.base_url, "v2/top-headlines")?;
        let page_size = page_size.to_string();
        let query = [
            ("country", country),
            ("category", category),
            ("pageSize", page_size.as_str()),
        ];
        self.get_articles(endpoint, &query).await
    }

    async fn fetch_trending(&self, page_size: usize) -> Result<Vec<Article>> {
        Ok(aggregate_trending(self, &self.country, page_size).await)
    }
}

/// Keep only records that carry a title, description and URL.
fn into_articles(raw: Vec<RawArticle>) -> Vec<Article> {
    raw.into_iter()
        .filter_map(|r| {
            let title = non_blank(r.title)?;
            let description = non_blank(r.description)?;
            let url = non_blank(r.url)?;
            Some(Article {
                title,
                description,
                content: r.content.unwrap_or_default(),
                url,
                image_url: non_blank(r.url_to_image),
                source: r
                    .source
                    .and_then(|s| non_blank(s.name))
                    .unwrap_or_else(|| "Unknown".to_string()),
                author: non_blank(r.author),
                published_at: r.published_at.as_deref().and_then(parse_timestamp),
            })
        })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[derive(Deserialize)]
struct ArticlesResponse {
    status: String,
    #[serde(default)]
    articles: Vec<RawArticle>,
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    source: Option<RawSource>,
    author: Option<String>,
}

#[derive(Deserialize)]
struct RawSource {
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn into_articles_filters_incomplete_records() {
        let payload: ArticlesResponse = serde_json::from_value(json!({
            "status": "ok",
            "articles": [
                {
                    "title": "Complete",
                    "description": "All fields",
                    "url": "https://a.example/1",
                    "publishedAt": "2024-08-03T10:00:00Z",
                    "source": { "id": null, "name": "Wire" }
                },
                { "title": "No description", "url": "https://a.example/2" },
                { "title": "", "description": "Blank title", "url": "https://a.example/3" },
                { "title": "No url", "description": "d" }
            ]
        }))
        .unwrap();

        let articles = into_articles(payload.articles);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Complete");
        assert_eq!(articles[0].source, "Wire");
        assert_eq!(articles[0].content, "");
        assert_eq!(
            articles[0].published_at.unwrap().to_rfc3339(),
            "2024-08-03T10:00:00+00:00"
        );
    }

    #[test]
    fn missing_source_becomes_unknown() {
        let raw = vec![RawArticle {
            title: Some("t".into()),
            description: Some("d".into()),
            content: None,
            url: Some("u".into()),
            url_to_image: None,
            published_at: Some("not a date".into()),
            source: None,
            author: None,
        }];
        let articles = into_articles(raw);
        assert_eq!(articles[0].source, "Unknown");
        assert!(articles[0].published_at.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = NewsApiClient::new(
            "secret-key".into(),
            Url::parse("https://newsapi.org/").unwrap(),
            "us".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!format!("{:?}", client).contains("secret-key"));
    }
}
