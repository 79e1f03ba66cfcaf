//! Shared fixtures for server tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use geocache_core::{
    HierarchyPath, LocationFilter, LocationId, LocationPatch, LocationRecord, NewLocation,
};
use geocache_index::{CacheBackend, LocationIndex};
use geocache_server::LocationService;
use geocache_storage::{InMemoryLocationStore, LocationStore, StorageError, UpdateOutcome};

/// Counts calls into an in-memory store.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryLocationStore,
    pub inserts: AtomicUsize,
    pub gets: AtomicUsize,
    pub queries: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryLocationStore::new(),
            ..Default::default()
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationStore for CountingStore {
    async fn insert_record(&self, location: &NewLocation) -> Result<LocationRecord, StorageError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_record(location).await
    }

    async fn get_record(&self, id: LocationId) -> Result<Option<LocationRecord>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_record(id).await
    }

    async fn query_records(
        &self,
        filter: &LocationFilter,
    ) -> Result<Vec<LocationRecord>, StorageError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_records(filter).await
    }

    async fn update_record(
        &self,
        id: LocationId,
        patch: &LocationPatch,
    ) -> Result<Option<UpdateOutcome>, StorageError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_record(id, patch).await
    }

    async fn delete_record(&self, id: LocationId) -> Result<bool, StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_record(id).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

pub fn new_location(name: &str, country: &str, state: &str, city: &str, area: &str) -> NewLocation {
    NewLocation {
        name: name.into(),
        description: format!("{name} description"),
        street_address: format!("{name} street"),
        path: HierarchyPath::new(country, state, city, area),
    }
}

pub fn service_with(store: Arc<CountingStore>, backend: CacheBackend) -> LocationService {
    service_with_deadline(store, backend, Duration::from_millis(500))
}

pub fn service_with_deadline(
    store: Arc<CountingStore>,
    backend: CacheBackend,
    op_timeout: Duration,
) -> LocationService {
    let index = LocationIndex::new(backend, Duration::from_secs(3600));
    LocationService::new(store, index, op_timeout)
}

pub fn local_service() -> (LocationService, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::new());
    (service_with(store.clone(), CacheBackend::new_local()), store)
}

/// A Redis backend whose connections are refused.
pub fn unreachable_redis() -> CacheBackend {
    let mut config = deadpool_redis::Config::from_url("redis://127.0.0.1:1");
    let pool_config = config
        .pool
        .get_or_insert_with(|| deadpool_redis::PoolConfig::new(1));
    pool_config.timeouts.wait = Some(Duration::from_millis(200));
    pool_config.timeouts.create = Some(Duration::from_millis(200));
    let pool = config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("create pool");
    CacheBackend::new_redis(pool)
}

/// A Redis backend whose server accepts connections and never replies, so
/// every call hangs until the caller's deadline.
pub async fn silent_redis() -> CacheBackend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = deadpool_redis::Config::from_url(format!("redis://{addr}"));
    let pool_config = config
        .pool
        .get_or_insert_with(|| deadpool_redis::PoolConfig::new(1));
    pool_config.timeouts.wait = Some(Duration::from_secs(30));
    pool_config.timeouts.create = Some(Duration::from_secs(30));
    let pool = config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("create pool");
    CacheBackend::new_redis(pool)
}
