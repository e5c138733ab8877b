use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReelError {
    /// Provider answered with a non-success status or a malformed payload.
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("script generation failed: {0}")]
    Generation(String),
    #[error("voice synthesis failed: {0}")]
    Synthesis(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },
}

impl ReelError {
    /// Only an empty article batch aborts a whole request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReelError::NotFound(_))
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ReelError::Upstream(_) | ReelError::Http(_) | ReelError::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReelError>;
