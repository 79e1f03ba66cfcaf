//! Cache backend selection and the service against a real Redis.

mod common;

use std::sync::Arc;

use common::{CountingStore, new_location, service_with};
use geocache_core::LocationFilter;
use geocache_server::{RedisConfig, create_cache_backend};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");
            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            (container, format!("redis://127.0.0.1:{host_port}"))
        })
        .await;
    url.clone()
}

#[tokio::test]
async fn test_disabled_redis_uses_local_index() {
    let backend = create_cache_backend(&RedisConfig::default()).await;
    assert_eq!(backend.mode(), "local");
}

#[tokio::test]
async fn test_unreachable_redis_falls_back_to_local() {
    let config = RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".into(),
        pool_size: 1,
        timeout_ms: 200,
    };
    let backend = create_cache_backend(&config).await;
    assert_eq!(backend.mode(), "local");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_service_over_redis() {
    let config = RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        ..Default::default()
    };
    let backend = create_cache_backend(&config).await;
    assert_eq!(backend.mode(), "redis");

    let store = Arc::new(CountingStore::new());
    let service = service_with(store.clone(), backend);
    assert!(service.cache_available().await);

    let record = service
        .add_record(&new_location("A", "ZA", "GP", "Joburg", "Sandton"))
        .await
        .unwrap();
    let found = service
        .get_records(&LocationFilter::City("Joburg".into()))
        .await
        .unwrap();
    assert_eq!(found, vec![record.clone()]);
    assert_eq!(store.queries(), 0);

    let report = service.delete_record(record.id).await.unwrap();
    assert_eq!(report.removed, Some(record));
    let found = service
        .get_records(&LocationFilter::Area("Sandton".into()))
        .await
        .unwrap();
    assert!(found.is_empty());
}
