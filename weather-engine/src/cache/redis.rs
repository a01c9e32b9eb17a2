use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::{future::Future, time::Duration};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{CacheError, CacheStore};

/// Upper bound for a single Redis round trip, connecting included.
pub const REDIS_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis-backed store.
///
/// The connection is opened on first use rather than at construction, so an
/// unreachable Redis degrades into per-operation errors instead of blocking
/// startup. Once established, `ConnectionManager` reconnects on its own.
pub struct RedisStore {
    client: Client,
    conn: OnceCell<ConnectionManager>,
    op_timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("addr", &self.client.get_connection_info().addr)
            .field("connected", &self.conn.initialized())
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

impl RedisStore {
    /// Validates the URL without connecting.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;

        Ok(Self {
            client,
            conn: OnceCell::new(),
            op_timeout: REDIS_OP_TIMEOUT,
        })
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| CacheError::Connection(e.to_string()))?;
                info!(addr = ?self.client.get_connection_info().addr, "Redis connected");
                Ok::<_, CacheError>(conn)
            })
            .await?;

        Ok(conn.clone())
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(key).await?;
            debug!(key, hit = value.is_some(), "redis GET");
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            match ttl {
                Some(ttl) => {
                    // SETEX rejects a zero expiry.
                    let seconds = ttl.as_secs().max(1);
                    conn.set_ex::<_, _, ()>(key, value, seconds).await?;
                }
                None => conn.set::<_, _, ()>(key, value).await?,
            }
            debug!(key, ?ttl, "redis SET");
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.del::<_, ()>(key).await?;
            Ok(())
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let found: bool = conn.exists(key).await?;
            Ok(found)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_rejected_without_connecting() {
        let err = RedisStore::new("not a url").unwrap_err();
        assert!(matches!(err, CacheError::Backend(_)));
    }

    #[test]
    fn valid_url_does_not_connect_eagerly() {
        let store = RedisStore::new("redis://127.0.0.1:6379/").unwrap();
        assert!(!store.conn.initialized());
    }

    #[tokio::test]
    async fn unreachable_server_surfaces_as_cache_error() {
        // Nothing listens on port 1.
        let store = RedisStore::new("redis://127.0.0.1:1/")
            .unwrap()
            .with_op_timeout(Duration::from_millis(500));

        let err = store.get("weather:current:London:current:metric").await.unwrap_err();
        assert!(matches!(err, CacheError::Connection(_) | CacheError::Timeout(_)));
    }
}
