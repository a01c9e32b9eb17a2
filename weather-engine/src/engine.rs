//! Cache-aside retrieval of current weather and forecasts.
//!
//! Every request derives a key, tries the cache, and only on a miss goes to
//! the upstream provider. Successful upstream results are written back with a
//! fixed TTL. Cache faults are logged and absorbed in both directions; upstream
//! failures are classified into [`WeatherError`] and never cached.
//!
//! Concurrent misses for the same key each call upstream independently, and a
//! caller dropping the returned future drops the in-flight upstream request
//! with it.

use chrono::{Local, NaiveDate};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::{
    cache::{CacheError, CacheStore},
    config::Config,
    error::WeatherError,
    key::key_for,
    model::{QueryKind, UnitSystem, WeatherQuery, WeatherSnapshot},
    provider::{UpstreamClient, UpstreamError},
};

/// Lifetime of a cached snapshot.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Upper bound on a single upstream fetch.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Length of the forecast window, counted from today.
pub const FORECAST_DAYS: i64 = 7;

/// Data elements requested from upstream, identical for both operations.
pub const ELEMENTS: &str = "datetime,temp,tempmax,tempmin,humidity,conditions,description,icon,\
windspeed,winddir,pressure,visibility,uvindex,sunrise,sunset";

const INCLUDE: &str = "current,days";

/// Immutable engine settings, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct EngineSettings {
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl EngineSettings {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Weather API key is required.\n\
                 Hint: run `weather configure` or set WEATHER_API_KEY."
            ));
        }

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| anyhow::anyhow!("Invalid upstream base URL '{base_url}': {e}"))?;
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(anyhow::anyhow!(
                "Invalid upstream base URL '{base_url}': must not carry a query or fragment"
            ));
        }

        Ok(Self { base_url, api_key })
    }

    /// Fails when no credential is configured; the service must not start
    /// without one.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            anyhow::anyhow!(
                "Weather API key is required.\n\
                 Hint: run `weather configure` or set WEATHER_API_KEY."
            )
        })?;

        Self::new(config.upstream.base_url.as_str(), api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Date segments of an upstream request.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

pub struct WeatherEngine {
    settings: EngineSettings,
    cache: Arc<dyn CacheStore>,
    upstream: Arc<dyn UpstreamClient>,
    today: fn() -> NaiveDate,
}

impl std::fmt::Debug for WeatherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherEngine")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .field("upstream", &self.upstream)
            .finish()
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl WeatherEngine {
    pub fn new(
        settings: EngineSettings,
        cache: Arc<dyn CacheStore>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            settings,
            cache,
            upstream,
            today: local_today,
        }
    }

    /// Replace the source of "today" used for forecast windows.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    #[instrument(skip_all, fields(location = %query.location, date = ?query.date))]
    pub async fn get_current_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let window = Window {
            start: query.date,
            end: None,
        };
        self.retrieve(QueryKind::Current, query, window).await
    }

    /// Forecast for a seven-day window.
    ///
    /// The window starts at the query date, or today when none is given. The
    /// end date is always today plus seven days, even when the caller picked a
    /// different start date.
    #[instrument(skip_all, fields(location = %query.location, date = ?query.date))]
    pub async fn get_weather_forecast(
        &self,
        query: &WeatherQuery,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let today = (self.today)();
        let start = query.date.unwrap_or(today);
        let end = today + chrono::Duration::days(FORECAST_DAYS);

        let window = Window {
            start: Some(start),
            end: Some(end),
        };
        self.retrieve(QueryKind::Forecast, query, window).await
    }

    /// Remove the cached snapshot for a query. Returns whether one existed.
    #[instrument(skip_all, fields(kind = %kind, location = %query.location))]
    pub async fn evict(&self, kind: QueryKind, query: &WeatherQuery) -> Result<bool, CacheError> {
        let key = key_for(kind, query);
        if !self.cache.exists(&key).await? {
            return Ok(false);
        }

        self.cache.delete(&key).await?;
        info!(%key, "evicted cached weather");
        Ok(true)
    }

    async fn retrieve(
        &self,
        kind: QueryKind,
        query: &WeatherQuery,
        window: Window,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let key = key_for(kind, query);

        if let Some(snapshot) = self.read_cached(&key).await {
            debug!(%key, "cache hit");
            return Ok(snapshot);
        }

        info!(%key, "cache miss, fetching from upstream");
        let url = self.build_url(
            &query.location,
            window.start,
            window.end,
            query.effective_unit_system(),
        )?;
        let snapshot = self.fetch(&url).await.map_err(|err| {
            warn!(%key, error = %err, "upstream fetch failed");
            WeatherError::from(err)
        })?;

        self.write_cached(&key, &snapshot).await;
        Ok(snapshot)
    }

    async fn fetch(&self, url: &Url) -> Result<WeatherSnapshot, UpstreamError> {
        tokio::time::timeout(UPSTREAM_TIMEOUT, self.upstream.fetch(url))
            .await
            .map_err(|_| UpstreamError::Timeout)?
    }

    /// Any fault here, including an undecodable payload, reads as a miss.
    async fn read_cached(&self, key: &str) -> Option<WeatherSnapshot> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(%key, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(%key, error = %err, "cached payload is malformed, treating as miss");
                None
            }
        }
    }

    async fn write_cached(&self, key: &str, snapshot: &WeatherSnapshot) {
        let payload = match serde_json::to_string(snapshot) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%key, error = %err, "failed to serialize snapshot for cache");
                return;
            }
        };

        if let Err(err) = self.cache.set(key, &payload, Some(CACHE_TTL)).await {
            warn!(%key, error = %err, "cache write failed");
        }
    }

    /// `{base}/{location}[/{start}[/{end}]]?key=..&unitGroup=..&include=..&elements=..`
    pub(crate) fn build_url(
        &self,
        location: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        unit_system: UnitSystem,
    ) -> Result<Url, UpstreamError> {
        let mut raw = format!("{}/{}", self.settings.base_url, urlencoding::encode(location));

        if let Some(start) = start {
            raw.push_str(&format!("/{}", start.format("%Y-%m-%d")));
            if let Some(end) = end {
                raw.push_str(&format!("/{}", end.format("%Y-%m-%d")));
            }
        }

        let mut url = Url::parse(&raw)?;

        url.query_pairs_mut()
            .append_pair("key", &self.settings.api_key)
            .append_pair("unitGroup", unit_system.as_str())
            .append_pair("include", INCLUDE)
            .append_pair("elements", ELEMENTS);

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct NeverCalled;

    #[async_trait]
    impl UpstreamClient for NeverCalled {
        async fn fetch(&self, _url: &Url) -> Result<WeatherSnapshot, UpstreamError> {
            Err(UpstreamError::Timeout)
        }
    }

    fn engine() -> WeatherEngine {
        let settings = EngineSettings::new("https://api.test/weather/", "TEST_KEY").unwrap();
        WeatherEngine::new(settings, Arc::new(MemoryStore::new()), Arc::new(NeverCalled))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn query_value(url: &Url, name: &str) -> Option<String> {
        url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
    }

    #[test]
    fn settings_require_api_key() {
        let err = EngineSettings::new("https://api.test", "  ").unwrap_err();
        assert!(err.to_string().contains("Weather API key is required"));

        let err = EngineSettings::from_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("Hint:"));
    }

    #[test]
    fn settings_reject_invalid_base_url() {
        let err = EngineSettings::new("not a url", "KEY").unwrap_err();
        assert!(err.to_string().contains("Invalid upstream base URL"));

        for base in ["https://api.test/weather?v=2", "https://api.test/weather#top"] {
            let err = EngineSettings::new(base, "KEY").unwrap_err();
            assert!(err.to_string().contains("Invalid upstream base URL"), "{base}");
        }
    }

    #[test]
    fn settings_debug_hides_api_key() {
        let settings = EngineSettings::new("https://api.test", "SECRET").unwrap();
        assert!(!format!("{settings:?}").contains("SECRET"));
    }

    #[test]
    fn url_without_dates_has_location_only() {
        let url = engine().build_url("London", None, None, UnitSystem::Metric).unwrap();

        assert_eq!(url.path(), "/weather/London");
        assert_eq!(query_value(&url, "key").as_deref(), Some("TEST_KEY"));
        assert_eq!(query_value(&url, "unitGroup").as_deref(), Some("metric"));
        assert_eq!(query_value(&url, "include").as_deref(), Some("current,days"));
        assert_eq!(query_value(&url, "elements").as_deref(), Some(ELEMENTS));
    }

    #[test]
    fn url_encodes_location_segment() {
        let url = engine().build_url("New York, NY/US", None, None, UnitSystem::Us).unwrap();

        assert_eq!(url.path(), "/weather/New%20York%2C%20NY%2FUS");
        assert_eq!(query_value(&url, "unitGroup").as_deref(), Some("us"));
    }

    #[test]
    fn url_appends_date_segments_in_order() {
        let url = engine().build_url(
            "Paris",
            Some(date("2026-10-18")),
            Some(date("2026-10-25")),
            UnitSystem::Uk,
        )
        .unwrap();

        assert_eq!(url.path(), "/weather/Paris/2026-10-18/2026-10-25");
    }

    #[test]
    fn end_date_is_ignored_without_start() {
        let url = engine().build_url("Paris", None, Some(date("2026-10-25")), UnitSystem::Metric)
            .unwrap();
        assert_eq!(url.path(), "/weather/Paris");
    }

    #[test]
    fn elements_list_is_complete() {
        for element in [
            "temp", "tempmax", "tempmin", "humidity", "conditions", "description", "icon",
            "windspeed", "winddir", "pressure", "visibility", "uvindex", "sunrise", "sunset",
        ] {
            assert!(ELEMENTS.split(',').any(|e| e == element), "missing {element}");
        }
    }
}
