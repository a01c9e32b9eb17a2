use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Text};
use std::sync::Arc;
use tracing::debug;
use weather_engine::{
    CacheStore, Config, EngineSettings, MemoryStore, QueryKind, RedisStore, UPSTREAM_TIMEOUT,
    UnitSystem, VisualCrossingClient, WeatherEngine, WeatherError, WeatherQuery,
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather lookups backed by a shared cache")]
pub struct Cli {
    /// Log cache and upstream activity to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// What to look up. The location is used verbatim, including case and spacing.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Address or location name.
    #[arg(value_parser = parse_location)]
    location: String,

    /// Date as YYYY-MM-DD; if absent, means "now" (or "today" for forecasts).
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Unit system: metric, us or uk. Defaults to metric.
    #[arg(long, value_parser = parse_unit)]
    unit: Option<UnitSystem>,
}

impl QueryArgs {
    fn into_query(self) -> WeatherQuery {
        WeatherQuery {
            location: self.location,
            date: self.date,
            unit_system: self.unit,
        }
    }
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Print the raw snapshot as JSON.
    #[arg(long)]
    json: bool,

    /// Skip Redis and use a throwaway in-process cache.
    #[arg(long)]
    no_redis: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key, upstream URL and Redis location.
    Configure,

    /// Show current conditions for a location.
    Current {
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Show a seven-day forecast for a location.
    Forecast {
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Drop a cached entry so the next lookup goes to the provider.
    Evict {
        /// Which lookup to evict: current or forecast.
        #[arg(value_parser = parse_kind)]
        kind: QueryKind,
        #[command(flatten)]
        query: QueryArgs,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Current { query, fetch } => lookup(QueryKind::Current, query, fetch).await,
            Command::Forecast { query, fetch } => lookup(QueryKind::Forecast, query, fetch).await,
            Command::Evict { kind, query } => {
                let engine = build_engine(false)?;
                let query = query.into_query();
                let removed = engine
                    .evict(kind, &query)
                    .await
                    .context("Failed to evict cached weather")?;

                if removed {
                    println!("Evicted cached {kind} weather for {}", query.location);
                } else {
                    println!("Nothing cached for {kind} weather at {}", query.location);
                }
                Ok(())
            }
        }
    }
}

async fn lookup(kind: QueryKind, args: QueryArgs, fetch: FetchArgs) -> anyhow::Result<()> {
    let engine = build_engine(fetch.no_redis)?;
    let query = args.into_query();

    let result = match kind {
        QueryKind::Current => engine.get_current_weather(&query).await,
        QueryKind::Forecast => engine.get_weather_forecast(&query).await,
    };
    let snapshot = result.map_err(describe)?;

    if fetch.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", output::render(&snapshot, query.effective_unit_system()));
    }

    Ok(())
}

/// Startup wiring. A missing API key stops here, before any lookup.
fn build_engine(no_redis: bool) -> anyhow::Result<WeatherEngine> {
    let config = Config::load()?;
    let settings = EngineSettings::from_config(&config)?;

    let cache: Arc<dyn CacheStore> = if no_redis {
        Arc::new(MemoryStore::new())
    } else {
        let url = config.redis_url();
        Arc::new(
            RedisStore::new(&url).with_context(|| format!("Invalid Redis address: {url}"))?,
        )
    };

    let upstream =
        VisualCrossingClient::new(UPSTREAM_TIMEOUT).context("Failed to build HTTP client")?;

    debug!(base_url = settings.base_url(), ?cache, "engine configured");

    Ok(WeatherEngine::new(settings, cache, Arc::new(upstream)))
}

/// The upstream cause was already logged by the engine; users get the class.
fn describe(err: WeatherError) -> anyhow::Error {
    let hint = match &err {
        WeatherError::Unauthorized => "\nHint: run `weather configure` to update your API key.",
        WeatherError::RateLimited => "\nHint: the provider is throttling requests; wait before retrying.",
        _ => "",
    };

    anyhow!("{err} (status {}){hint}", err.status_code())
}

fn configure() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    let mut cfg = Config::load_from(&path)?;

    let has_key = cfg.api_key().is_some();
    let mut prompt = Password::new("Weather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked);
    if has_key {
        prompt = prompt.with_help_message("Leave empty to keep the current key");
    }
    let api_key = prompt.prompt()?;

    let base_url = Text::new("Upstream base URL:")
        .with_default(&cfg.upstream.base_url)
        .prompt()?;

    let host = Text::new("Redis host:").with_default(&cfg.cache.host).prompt()?;

    let port = CustomType::<u16>::new("Redis port:")
        .with_default(cfg.cache.port)
        .with_error_message("Please enter a valid port number")
        .prompt()?;

    if !api_key.trim().is_empty() {
        cfg.upstream.api_key = Some(api_key.trim().to_string());
    }
    cfg.upstream.base_url = base_url;
    cfg.cache.host = host;
    cfg.cache.port = port;

    // Refuse to save something the engine would reject at startup.
    EngineSettings::from_config(&cfg)?;

    cfg.save_to(&path)?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

fn parse_location(value: &str) -> anyhow::Result<String> {
    if value.trim().is_empty() {
        return Err(anyhow!("Location must not be empty"));
    }
    if value.chars().all(|c| c == '.') {
        return Err(anyhow!("Location must not consist only of dots"));
    }
    Ok(value.to_string())
}

fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}

fn parse_unit(value: &str) -> anyhow::Result<UnitSystem> {
    UnitSystem::try_from(value)
}

fn parse_kind(value: &str) -> anyhow::Result<QueryKind> {
    QueryKind::try_from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn current_parses_full_query() {
        let cli = Cli::try_parse_from([
            "weather", "current", "New York", "--date", "2026-10-18", "--unit", "us", "--json",
        ])
        .unwrap();

        match cli.command {
            Command::Current { query, fetch } => {
                let query = query.into_query();
                assert_eq!(query.location, "New York");
                assert_eq!(query.date, NaiveDate::from_ymd_opt(2026, 10, 18));
                assert_eq!(query.unit_system, Some(UnitSystem::Us));
                assert!(fetch.json);
                assert!(!fetch.no_redis);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn forecast_defaults_leave_query_open() {
        let cli = Cli::try_parse_from(["weather", "forecast", "London", "--no-redis"]).unwrap();

        match cli.command {
            Command::Forecast { query, fetch } => {
                let query = query.into_query();
                assert_eq!(query.date, None);
                assert_eq!(query.unit_system, None);
                assert!(fetch.no_redis);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_location() {
        assert!(Cli::try_parse_from(["weather", "current", "  "]).is_err());
    }

    #[test]
    fn rejects_dot_only_location() {
        assert!(Cli::try_parse_from(["weather", "current", ".."]).is_err());
        assert!(Cli::try_parse_from(["weather", "forecast", "."]).is_err());
        assert!(Cli::try_parse_from(["weather", "current", "St. Louis"]).is_ok());
    }

    #[test]
    fn rejects_non_iso_date() {
        assert!(Cli::try_parse_from(["weather", "current", "London", "--date", "18/10/2026"]).is_err());
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(Cli::try_parse_from(["weather", "current", "London", "--unit", "kelvin"]).is_err());
    }

    #[test]
    fn evict_parses_kind() {
        let cli = Cli::try_parse_from(["weather", "evict", "forecast", "Paris"]).unwrap();
        assert!(matches!(cli.command, Command::Evict { kind: QueryKind::Forecast, .. }));
    }

    #[test]
    fn describe_includes_status_and_hint() {
        let msg = describe(WeatherError::RateLimited).to_string();
        assert!(msg.contains("Rate limit exceeded"));
        assert!(msg.contains("429"));
        assert!(msg.contains("Hint:"));

        let msg = describe(WeatherError::InvalidRequest("Bad location".into())).to_string();
        assert!(msg.contains("(status 400)"));
        assert!(!msg.contains("Hint:"));
    }
}
