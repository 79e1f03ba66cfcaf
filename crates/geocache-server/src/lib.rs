pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod service;

use std::sync::Arc;
use std::time::Duration;

use geocache_db_postgres::PostgresLocationStore;
use geocache_index::CacheBackend;
use geocache_storage::{InMemoryLocationStore, LocationStore, StorageError};

pub use config::{AppConfig, CacheConfig, RedisConfig, ServerConfig, StorageBackend, StorageConfig};
pub use error::{ApiError, ServiceError};
pub use observability::{apply_logging_level, init_tracing};
pub use server::{AppState, GeocacheServer, ServerBuilder, build_app};
pub use service::{DeleteReport, LocationService};

fn redis_pool(config: &RedisConfig) -> Result<deadpool_redis::Pool, deadpool_redis::CreatePoolError> {
    let timeout = Some(Duration::from_millis(config.timeout_ms));
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(pool_config);
    redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1))
}

/// Pick the index backend.
///
/// With Redis disabled the index lives in process. With Redis enabled the
/// pool is checked with a `PING`; when that fails the server starts on the
/// in-process index rather than refusing to start.
pub async fn create_cache_backend(config: &RedisConfig) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using in-process index");
        return CacheBackend::new_local();
    }

    let pool = match redis_pool(config) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "invalid Redis pool settings, using in-process index");
            return CacheBackend::new_local();
        }
    };

    let backend = CacheBackend::new_redis(pool);
    if backend.is_available().await {
        tracing::info!(url = %config.url, pool_size = config.pool_size, "Redis index connected");
        backend
    } else {
        tracing::warn!(url = %config.url, "Redis unreachable, using in-process index");
        CacheBackend::new_local()
    }
}

/// Create the backing store selected by configuration.
pub async fn create_store(config: &StorageConfig) -> Result<Arc<dyn LocationStore>, StorageError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory backing store");
            Ok(Arc::new(InMemoryLocationStore::new()))
        }
        StorageBackend::Postgres => {
            tracing::info!(
                url = %geocache_db_postgres::mask_password(&config.postgres.url),
                "Using PostgreSQL backing store"
            );
            let store = PostgresLocationStore::new(&config.postgres).await?;
            Ok(Arc::new(store))
        }
    }
}
