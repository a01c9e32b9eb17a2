//! Cache-aside weather retrieval.
//!
//! This crate defines:
//! - The retrieval engine (current conditions and seven-day forecasts)
//! - Cache-key derivation and the key-value cache adapter (Redis, in-memory)
//! - The upstream client abstraction and its Visual Crossing implementation
//! - The domain error taxonomy upstream failures are mapped into
//! - Configuration & credentials handling
//!
//! It is used by `weather-cli`, but can also be embedded in other binaries or services.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod model;
pub mod provider;

pub use cache::{CacheError, CacheStore, MemoryStore, RedisStore};
pub use config::Config;
pub use engine::{CACHE_TTL, EngineSettings, UPSTREAM_TIMEOUT, WeatherEngine};
pub use error::WeatherError;
pub use key::derive_key;
pub use model::{
    CurrentConditions, DayWeather, QueryKind, UnitSystem, WeatherQuery, WeatherSnapshot,
};
pub use provider::{UpstreamClient, UpstreamError, VisualCrossingClient};
