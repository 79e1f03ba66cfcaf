//! Cache backend for the index: Redis, or an in-process local emulation.
//!
//! ## Modes
//!
//! - **Local**: single-instance mode, keys live in a `DashMap` inside the
//!   process. Used when Redis is disabled or unreachable at startup, and by
//!   tests.
//! - **Redis**: keys live in Redis and are shared by every instance. The
//!   handle wraps a `deadpool-redis` pool; each call acquires a connection
//!   for its own duration and returns it to the pool afterwards.
//!
//! The handle is cheap to clone and is passed explicitly to every index
//! component, so all in-flight requests share one pool.

mod local;
mod redis_ops;

use std::collections::HashMap;
use std::sync::Arc;

use deadpool_redis::Pool;

use crate::batch::Batch;
use crate::error::Result;

pub use local::LocalIndexStore;

#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: local DashMap only
    Local(Arc<LocalIndexStore>),

    /// Multi-instance: pooled Redis connections
    Redis(Pool),
}

impl std::fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CacheBackend").field(&self.mode()).finish()
    }
}

impl CacheBackend {
    /// Create a new local-only cache backend.
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(LocalIndexStore::new()))
    }

    /// Create a new Redis-backed cache backend.
    pub fn new_redis(pool: Pool) -> Self {
        CacheBackend::Redis(pool)
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis(_) => "redis",
        }
    }

    /// Submit a batch in one round trip.
    pub async fn execute(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        match self {
            CacheBackend::Local(store) => store.apply(batch),
            CacheBackend::Redis(pool) => redis_ops::execute(pool, batch).await,
        }
    }

    /// Read a string value.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            CacheBackend::Local(store) => store.get(key),
            CacheBackend::Redis(pool) => redis_ops::get(pool, key).await,
        }
    }

    /// Members of a set; empty if the set does not exist.
    pub async fn members(&self, key: &str) -> Result<Vec<String>> {
        match self {
            CacheBackend::Local(store) => store.members(key),
            CacheBackend::Redis(pool) => redis_ops::members(pool, key).await,
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self {
            CacheBackend::Local(store) => Ok(store.exists(key)),
            CacheBackend::Redis(pool) => redis_ops::exists(pool, key).await,
        }
    }

    /// Read one hash.
    pub async fn hash(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        let keys = [key.to_string()];
        let mut rows = self.hashes(&keys).await?;
        Ok(rows.pop().flatten())
    }

    /// Read many hashes in one round trip, preserving order.
    pub async fn hashes(&self, keys: &[String]) -> Result<Vec<Option<HashMap<String, String>>>> {
        match self {
            CacheBackend::Local(store) => keys.iter().map(|key| store.hash(key)).collect(),
            CacheBackend::Redis(pool) => redis_ops::hashes(pool, keys).await,
        }
    }

    /// Check if the backend answers (for health checks).
    pub async fn is_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => true,
            CacheBackend::Redis(pool) => match redis_ops::ping(pool).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Redis health check failed");
                    false
                }
            },
        }
    }

    /// The local key space, for inspection in tests and diagnostics.
    pub fn local_store(&self) -> Option<&Arc<LocalIndexStore>> {
        match self {
            CacheBackend::Local(store) => Some(store),
            CacheBackend::Redis(_) => None,
        }
    }
}
