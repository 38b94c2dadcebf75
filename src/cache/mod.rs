//! Redis-backed JSON cache for read-mostly responses. Every cache fault is
//! logged and the caller falls through to the database.

use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;

fn json_error(context: &'static str, e: serde_json::Error) -> RedisError {
    RedisError::from((redis::ErrorKind::TypeError, context, e.to_string()))
}

#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let connection = ConnectionManager::new(Client::open(redis_url)?).await?;
        Ok(Self { connection })
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> redis::RedisResult<Option<T>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|v| serde_json::from_str(&v).map_err(|e| json_error("cached value is not valid JSON", e)))
            .transpose()
    }

    /// Store `value` as JSON, expiring after `ttl` (at least one second).
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> redis::RedisResult<()> {
        let json = serde_json::to_string(value).map_err(|e| json_error("value cannot be cached", e))?;
        redis::cmd("SET")
            .arg(key)
            .arg(json)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut self.connection.clone())
            .await
    }

    /// Serve `key` from Redis, or run `load` and cache what it returns.
    /// Errors from `load` are returned untouched and nothing is cached.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(key, error = %e, "cache read failed"),
        }

        let fresh = load().await?;
        if let Err(e) = self.set(key, &fresh, ttl).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
        Ok(fresh)
    }

    /// Drop a key after the data behind it changed.
    pub async fn invalidate(&self, key: &str) {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<()> = conn.del(key).await;
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "cache invalidation failed");
        }
    }
}

pub mod keys {
    use uuid::Uuid;

    pub fn user(id: Uuid) -> String {
        format!("user:{id}")
    }

    pub fn job(id: Uuid) -> String {
        format!("job:{id}")
    }

    pub fn admin_stats() -> String {
        "admin:stats".to_string()
    }
}

/// Per-resource expiry, read from `CACHE_TTL_*`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub user_ttl: Duration,
    pub job_ttl: Duration,
    pub stats_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user_ttl: Duration::from_secs(15 * 60),
            job_ttl: Duration::from_secs(5 * 60),
            stats_ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            user_ttl: ttl_from_env("CACHE_TTL_USERS", 900),
            job_ttl: ttl_from_env("CACHE_TTL_JOB_DETAIL", 300),
            stats_ttl: ttl_from_env("CACHE_TTL_ADMIN_STATS", 60),
        }
    }
}

fn ttl_from_env(name: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

pub type CacheData = Arc<RedisCache>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn keys_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(keys::user(id), format!("user:{id}"));
        assert_eq!(keys::job(id), format!("job:{id}"));
        assert_eq!(keys::admin_stats(), "admin:stats");
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = CacheConfig::default();
        assert_eq!(config.user_ttl, Duration::from_secs(900));
        assert_eq!(config.stats_ttl, Duration::from_secs(60));
    }
}
