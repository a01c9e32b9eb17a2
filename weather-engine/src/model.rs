use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// Unit system requested from the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Us,
    Uk,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Us => "us",
            UnitSystem::Uk => "uk",
        }
    }

    pub const fn all() -> &'static [UnitSystem] {
        &[UnitSystem::Metric, UnitSystem::Us, UnitSystem::Uk]
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "us" => Ok(UnitSystem::Us),
            "uk" => Ok(UnitSystem::Uk),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported unit systems: metric, us, uk."
            )),
        }
    }
}

/// Which engine operation a query is issued through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Current,
    Forecast,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Current => "current",
            QueryKind::Forecast => "forecast",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for QueryKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "current" => Ok(QueryKind::Current),
            "forecast" => Ok(QueryKind::Forecast),
            _ => Err(anyhow::anyhow!(
                "Unknown query kind '{value}'. Supported kinds: current, forecast."
            )),
        }
    }
}

/// An already-validated retrieval request.
///
/// The location is passed to the cache key and the upstream path verbatim:
/// "London" and "london " are different queries. A location made only of
/// dots becomes a dot segment that URL parsing resolves against the base path,
/// so callers should reject those before building a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub location: String,
    pub date: Option<NaiveDate>,
    pub unit_system: Option<UnitSystem>,
}

impl WeatherQuery {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            date: None,
            unit_system: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_unit_system(mut self, unit_system: UnitSystem) -> Self {
        self.unit_system = Some(unit_system);
        self
    }

    pub fn effective_unit_system(&self) -> UnitSystem {
        self.unit_system.unwrap_or_default()
    }
}

/// Weather for a location as returned by the provider and stored in the cache.
///
/// Field names follow the upstream timeline payload so the cached JSON and the
/// upstream body have the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "resolvedAddress")]
    pub resolved_location_name: String,
    pub timezone: String,
    #[serde(default)]
    pub days: Vec<DayWeather>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_conditions: Option<CurrentConditions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayWeather {
    pub datetime: Option<String>,
    pub temp: Option<f64>,
    pub tempmax: Option<f64>,
    pub tempmin: Option<f64>,
    pub humidity: Option<f64>,
    pub conditions: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub windspeed: Option<f64>,
    pub winddir: Option<f64>,
    pub pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub uvindex: Option<f64>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub datetime: Option<String>,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub conditions: Option<String>,
    pub icon: Option<String>,
    pub windspeed: Option<f64>,
    pub winddir: Option<f64>,
    pub pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub uvindex: Option<f64>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}
