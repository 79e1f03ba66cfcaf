//! The backing store contract.

use async_trait::async_trait;
use geocache_core::{LocationFilter, LocationId, LocationPatch, LocationRecord, NewLocation};
use serde::Serialize;

use crate::error::StorageError;

/// Result of a successful update: the id and the fields actually applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub id: LocationId,
    pub applied: LocationPatch,
}

/// The durable, canonical source of location records.
///
/// Implementations must be thread-safe (`Send + Sync`). Hierarchy names are
/// stored normalized; every method returns records with names resolved.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Inserts a new location and returns the canonical stored record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Invalid` if the hierarchy is malformed.
    async fn insert_record(&self, location: &NewLocation) -> Result<LocationRecord, StorageError>;

    /// Reads a single location. Returns `None` if it does not exist.
    async fn get_record(&self, id: LocationId) -> Result<Option<LocationRecord>, StorageError>;

    /// Lists every location matching the filter.
    async fn query_records(
        &self,
        filter: &LocationFilter,
    ) -> Result<Vec<LocationRecord>, StorageError>;

    /// Applies a partial update. Returns `None` if the location does not exist.
    ///
    /// Absent fields and empty hierarchy values are left unchanged; the
    /// returned outcome lists exactly what was written.
    async fn update_record(
        &self,
        id: LocationId,
        patch: &LocationPatch,
    ) -> Result<Option<UpdateOutcome>, StorageError>;

    /// Deletes a location. Returns `false` if it did not exist.
    async fn delete_record(&self, id: LocationId) -> Result<bool, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
