use async_trait::async_trait;
use std::fmt::Debug;
use url::Url;

use crate::model::WeatherSnapshot;

pub mod visualcrossing;

pub use visualcrossing::VisualCrossingClient;

/// Failure of a single upstream fetch, before it is classified for callers.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream responded with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("Upstream request timed out")]
    Timeout,
    #[error("Upstream transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Malformed upstream response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Upstream response exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Transport(err)
        }
    }
}

/// Something that can turn a fully built upstream URL into a snapshot.
#[async_trait]
pub trait UpstreamClient: Send + Sync + Debug {
    async fn fetch(&self, url: &Url) -> Result<WeatherSnapshot, UpstreamError>;
}
