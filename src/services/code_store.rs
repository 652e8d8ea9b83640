use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::{bb8, redis, RedisConnectionManager};

use crate::error::{Error, Result};

/// Short-lived key-value store for one-time codes, keyed by user email.
/// Expiry is entirely the store's concern: the TTL is set on write and never
/// re-checked here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

#[derive(Clone)]
pub struct RedisCodeStore {
    pool: bb8::Pool<RedisConnectionManager>,
}

impl RedisCodeStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let manager = RedisConnectionManager::new(redis_url)
            .map_err(|e| Error::CodeStore(e.to_string()))?;
        let pool = bb8::Pool::builder()
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .await
            .map_err(|e| Error::CodeStore(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CodeStore for RedisCodeStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::CodeStore(e.to_string()))?;
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::CodeStore(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::CodeStore(e.to_string()))?;
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs())
            .arg(value)
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::CodeStore(e.to_string()))
    }
}

/// In-memory store for tests and local runs without Redis. Entries never
/// expire; the TTL argument is accepted and ignored.
#[derive(Debug, Default)]
pub struct InMemoryCodeStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeStore for InMemoryCodeStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::CodeStore("poisoned lock".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::CodeStore("poisoned lock".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
