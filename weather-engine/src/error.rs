//! Domain errors returned by the engine.

use thiserror::Error;

use crate::provider::UpstreamError;

const DEFAULT_INVALID_REQUEST_MESSAGE: &str = "Weather API error";

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    /// The cause is kept for logging; callers should only rely on the kind.
    #[error("Failed to fetch weather data")]
    UpstreamUnavailable(#[source] UpstreamError),
}

impl WeatherError {
    /// HTTP status class a boundary should report this error as.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Unauthorized => 401,
            Self::RateLimited => 429,
            Self::UpstreamUnavailable(_) => 500,
        }
    }

    /// Whether the caller should slow down before trying again.
    pub fn should_back_off(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl From<UpstreamError> for WeatherError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status: 400, message } => Self::InvalidRequest(
                message.unwrap_or_else(|| DEFAULT_INVALID_REQUEST_MESSAGE.to_string()),
            ),
            UpstreamError::Status { status: 401, .. } => Self::Unauthorized,
            UpstreamError::Status { status: 429, .. } => Self::RateLimited,
            other => Self::UpstreamUnavailable(other),
        }
    }
}
