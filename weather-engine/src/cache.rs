//! Key-value cache adapter.
//!
//! A thin capability over an external store: no serialization, no policy.
//! The engine decides what to store and how to react to failures.

use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Cache backend error: {0}")]
    Backend(#[from] ::redis::RedisError),
}

#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`. With `ttl` the entry expires on its own,
    /// without it the entry lives until overwritten or deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}
