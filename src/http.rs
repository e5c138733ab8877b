use reqwest::{Client, Response, Url};
use std::time::Duration;

use crate::error::{ReelError, Result};

const USER_AGENT: &str = "news-reels/0.1";

pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

pub fn parse_base_url(raw: &str) -> Result<Url> {
    // `Url::join` drops the last path segment unless the base ends with '/'.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| ReelError::Upstream(format!("invalid base URL {raw}: {e}")))
}

pub fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| ReelError::Upstream(format!("invalid endpoint {path}: {e}")))
}

/// Turn a non-success response into `ReelError::Upstream` carrying its body.
pub async fn check_status(res: Response, provider: &str) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    Err(ReelError::Upstream(format!("{provider} error {status}: {body}")))
}
