//! Durable key-value backends for the playback state record.
//!
//! Exactly one key is owned by this service. The backend contract is a
//! plain read/write of the serialized record; atomicity of the single
//! write is the backend's job, read-modify-write composition is the
//! playback service's.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager as RedisConnectionManager;

use crate::Result;

/// Storage backend for the serialized playback record.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the stored record, `None` if never written.
    async fn read(&self) -> Result<Option<String>>;

    /// Overwrite the stored record. Once this returns `Ok`, the value
    /// survives a process restart (for backends that are durable at all).
    async fn write(&self, value: &str) -> Result<()>;
}

/// Redis-backed store: one key, plain GET/SET.
#[derive(Clone)]
pub struct RedisBackend {
    redis: RedisConnectionManager,
    key: String,
}

impl RedisBackend {
    #[must_use]
    pub fn new(redis: RedisConnectionManager, key_prefix: &str) -> Self {
        Self {
            redis,
            key: format!("{key_prefix}playback"),
        }
    }
}

#[async_trait]
impl StateBackend for RedisBackend {
    async fn read(&self) -> Result<Option<String>> {
        let mut conn = self.redis.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(&self.key)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn write(&self, value: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("SET")
            .arg(&self.key)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// In-process backend for single-node mode and tests.
///
/// Cloning shares the underlying cell, so a rebuilt service layer over a
/// clone observes earlier writes the way a restarted process observes
/// Redis.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    cell: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn read(&self) -> Result<Option<String>> {
        Ok(self.cell.lock().clone())
    }

    async fn write(&self, value: &str) -> Result<()> {
        *self.cell.lock() = Some(value.to_string());
        Ok(())
    }
}
