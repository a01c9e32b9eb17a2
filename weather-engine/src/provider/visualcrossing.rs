use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::model::WeatherSnapshot;

use super::{UpstreamClient, UpstreamError};

pub const DEFAULT_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

/// Largest response body buffered from upstream.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const USER_AGENT: &str = concat!("weather-engine/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Visual Crossing timeline API.
#[derive(Debug, Clone)]
pub struct VisualCrossingClient {
    http: Client,
    max_body: usize,
}

impl VisualCrossingClient {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(UpstreamError::Transport)?;

        Ok(Self {
            http,
            max_body: MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[async_trait]
impl UpstreamClient for VisualCrossingClient {
    #[instrument(skip_all, fields(path = url.path()))]
    async fn fetch(&self, url: &Url) -> Result<WeatherSnapshot, UpstreamError> {
        let res = self.http.get(url.clone()).send().await?;
        let status = res.status();

        // A failed status is reported as such even when its body is unreadable.
        if !status.is_success() {
            let message = match read_body(res, self.max_body).await {
                Ok(body) => error_message(&body),
                Err(err) => {
                    debug!(%status, error = %err, "could not read error body");
                    None
                }
            };
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = read_body(res, self.max_body).await?;
        debug!(%status, bytes = body.len(), "upstream responded");

        Ok(serde_json::from_str(&body)?)
    }
}

async fn read_body(mut res: Response, limit: usize) -> Result<String, UpstreamError> {
    if res.content_length().is_some_and(|len| len > limit as u64) {
        return Err(UpstreamError::TooLarge { limit });
    }

    let mut buf = Vec::new();
    while let Some(chunk) = res.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Err(UpstreamError::TooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Visual Crossing reports most errors as plain text; some gateways send
/// `{"message": ...}` instead.
fn error_message(body: &str) -> Option<String> {
    if let Ok(ErrorBody { message: Some(message) }) = serde_json::from_str::<ErrorBody>(body) {
        return Some(message);
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate_body(trimmed))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
