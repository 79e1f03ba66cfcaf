//! Cache-aside location service.
//!
//! Reads try the index first and fall through to the backing store on an
//! empty result or a cache failure, repopulating the index from what the
//! store returns. Writes go to the store first and are then reflected in the
//! index. Every cache call is bounded by the configured deadline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use geocache_core::{LocationFilter, LocationId, LocationPatch, LocationRecord, NewLocation};
use geocache_index::{CacheBackend, IndexError, LocationIndex};
use geocache_storage::LocationStore;
use serde::Serialize;
use tracing::instrument;

use crate::error::ServiceError;
use crate::metrics;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Outcome of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub status: &'static str,
    pub message: String,
    /// The cached record that was removed, if it was cached.
    pub removed: Option<LocationRecord>,
    /// Index sets the record was removed from.
    pub removed_from: Vec<String>,
}

#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn LocationStore>,
    index: LocationIndex,
    op_timeout: Duration,
}

impl std::fmt::Debug for LocationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationService")
            .field("store", &self.store.backend_name())
            .field("cache", &self.index.backend().mode())
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

impl LocationService {
    pub fn new(store: Arc<dyn LocationStore>, index: LocationIndex, op_timeout: Duration) -> Self {
        Self {
            store,
            index,
            op_timeout,
        }
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn cache_mode(&self) -> &'static str {
        self.index.backend().mode()
    }

    pub async fn cache_available(&self) -> bool {
        let backend: &CacheBackend = self.index.backend();
        tokio::time::timeout(self.op_timeout, backend.is_available())
            .await
            .unwrap_or(false)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = geocache_index::Result<T>>,
    ) -> geocache_index::Result<T> {
        match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(IndexError::Timeout(self.op_timeout)),
        }
    }

    /// Best-effort repopulation after a store read.
    async fn repopulate(&self, records: &[LocationRecord]) {
        if let Err(e) = self.bounded(self.index.index(records)).await {
            metrics::record_repopulate_failure();
            tracing::warn!(error = %e, records = records.len(), "failed to repopulate cache");
        }
    }

    /// Insert into the store, then index the canonical record.
    #[instrument(skip_all)]
    pub async fn add_record(&self, location: &NewLocation) -> Result<LocationRecord> {
        location.validate()?;

        metrics::record_store_query("insert");
        let record = self.store.insert_record(location).await?;

        self.bounded(self.index.index(std::slice::from_ref(&record)))
            .await?;
        tracing::info!(id = record.id, "location added");
        Ok(record)
    }

    /// Records matching `filter`, from the cache when it has any.
    #[instrument(skip(self), fields(filter = %filter))]
    pub async fn get_records(&self, filter: &LocationFilter) -> Result<Vec<LocationRecord>> {
        filter.validate()?;
        let kind = filter.kind();

        match self.bounded(self.index.query(filter)).await {
            Ok(records) if !records.is_empty() => {
                metrics::record_cache_hit(kind);
                tracing::debug!(count = records.len(), "cache hit");
                return Ok(records);
            }
            Ok(_) => {
                metrics::record_cache_miss(kind);
                tracing::debug!("cache miss");
            }
            Err(e) if e.is_transport() => {
                metrics::record_cache_fallback("query");
                tracing::warn!(error = %e, "cache read failed, falling back to store");
            }
            Err(e) => return Err(e.into()),
        }

        metrics::record_store_query("query");
        let records = self.store.query_records(filter).await?;
        if !records.is_empty() {
            self.repopulate(&records).await;
        }
        Ok(records)
    }

    /// A single record, from the cache when present.
    #[instrument(skip(self))]
    pub async fn get_record(&self, id: LocationId) -> Result<LocationRecord> {
        match self.bounded(self.index.fetch(id)).await {
            Ok(Some(record)) => {
                metrics::record_cache_hit("id");
                return Ok(record);
            }
            Ok(None) => metrics::record_cache_miss("id"),
            Err(e) => {
                metrics::record_cache_fallback("fetch");
                tracing::warn!(error = %e, "cache read failed, falling back to store");
            }
        }

        metrics::record_store_query("get");
        let record = self
            .store
            .get_record(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(id))?;
        self.repopulate(std::slice::from_ref(&record)).await;
        Ok(record)
    }

    /// Update the store, then bring the cache in line.
    ///
    /// A change to any hierarchy field moves the record between sets. The
    /// previous path is read from the store before the update, so the old
    /// memberships are cleared even when the cached hash has already
    /// expired, and the canonical record is then re-indexed. A change to
    /// descriptive fields only is patched in place.
    #[instrument(skip(self, patch))]
    pub async fn update_record(
        &self,
        id: LocationId,
        patch: &LocationPatch,
    ) -> Result<LocationRecord> {
        let patch = patch.clone().normalized();
        patch.validate()?;

        let previous = if patch.touches_hierarchy() {
            metrics::record_store_query("get");
            Some(
                self.store
                    .get_record(id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found(id))?,
            )
        } else {
            None
        };

        metrics::record_store_query("update");
        let outcome = self
            .store
            .update_record(id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found(id))?;

        if let Some(previous) = previous.filter(|_| outcome.applied.touches_hierarchy()) {
            metrics::record_store_query("get");
            let record = self
                .store
                .get_record(id)
                .await?
                .ok_or_else(|| ServiceError::not_found(id))?;

            self.bounded(self.index.remove_from_path(id, &previous.path))
                .await?;
            self.bounded(self.index.index(std::slice::from_ref(&record)))
                .await?;
            tracing::info!(id, "location moved in hierarchy");
            return Ok(record);
        }

        let Some(fields) = outcome.applied.field_patch() else {
            return Err(ServiceError::Validation(geocache_core::CoreError::EmptyPatch));
        };
        match self.bounded(self.index.apply_patch(id, &fields)).await {
            Ok(record) => {
                tracing::info!(id, "location updated");
                Ok(record)
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(id, "updated location not cached");
                metrics::record_store_query("get");
                self.store
                    .get_record(id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete from the store, then undo every index entry for the record.
    ///
    /// When the cached hash is gone its set memberships may still be live,
    /// so they are cleared from the path the store held.
    #[instrument(skip(self))]
    pub async fn delete_record(&self, id: LocationId) -> Result<DeleteReport> {
        metrics::record_store_query("get");
        let previous = self
            .store
            .get_record(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(id))?;

        metrics::record_store_query("delete");
        if !self.store.delete_record(id).await? {
            return Err(ServiceError::not_found(id));
        }

        let (removed, removed_from) = match self.bounded(self.index.remove(id)).await {
            Ok(removal) => (removal.record, removal.removed_from),
            Err(e) if e.is_not_found() => {
                tracing::debug!(id, "deleted location was not cached");
                self.bounded(self.index.remove_from_path(id, &previous.path))
                    .await?;
                (None, Vec::new())
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(id, "location deleted");
        Ok(DeleteReport {
            status: "success",
            message: format!("Location with ID {id} deleted successfully"),
            removed,
            removed_from,
        })
    }
}
