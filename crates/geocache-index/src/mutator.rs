//! Index mutator: in-place patches and full removal.

use std::time::Duration;

use geocache_core::{FieldPatch, HierarchyPath, LocationId, LocationRecord};
use tracing::instrument;

use crate::backend::CacheBackend;
use crate::batch::Batch;
use crate::error::{IndexError, Result};
use crate::keys::{ALL_KEY, IndexKeys, hash_key};

/// What `remove` undid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// The record as it was cached, if its hash still decoded.
    pub record: Option<LocationRecord>,
    /// Set keys the record's hash key was removed from.
    pub removed_from: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IndexMutator {
    backend: CacheBackend,
    ttl: Duration,
}

impl IndexMutator {
    pub fn new(backend: CacheBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Validate raw field/value pairs against the patchable allow-list and
    /// apply them.
    pub async fn patch_fields<I, K, V>(&self, id: LocationId, fields: I) -> Result<LocationRecord>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let patch = FieldPatch::new(fields)?;
        self.apply_patch(id, &patch).await
    }

    /// Merge descriptive fields into a cached record and refresh its TTL.
    ///
    /// Set memberships and reverse pointers are untouched: a `FieldPatch`
    /// cannot carry hierarchy fields.
    #[instrument(skip(self, patch), fields(fields = patch.len()))]
    pub async fn apply_patch(&self, id: LocationId, patch: &FieldPatch) -> Result<LocationRecord> {
        let key = hash_key(id);
        if !self.backend.exists(&key).await? {
            return Err(IndexError::not_found(id));
        }

        let mut batch = Batch::new();
        batch.hset(&key, patch.iter()).expire(&key, self.ttl);
        self.backend.execute(&batch).await?;

        let hash = self
            .backend
            .hash(&key)
            .await?
            .ok_or_else(|| IndexError::not_found(id))?;
        match LocationRecord::from_fields(&hash) {
            Ok(record) => {
                tracing::debug!("cached record patched");
                Ok(record)
            }
            Err(e) => {
                // The hash expired between the check and the write, leaving
                // only the patched fields behind.
                tracing::warn!(key = %key, error = %e, "dropping incomplete cached record");
                let mut cleanup = Batch::new();
                cleanup.del(&key);
                self.backend.execute(&cleanup).await?;
                Err(IndexError::not_found(id))
            }
        }
    }

    /// Remove a record from the five sets of `path` and delete its hash,
    /// whether or not the hash is still cached.
    ///
    /// Used when the record's previous path is known from the store: set
    /// memberships can outlive the hash, since every write under the same
    /// path refreshes the set TTLs. If a decodable hash names a different
    /// path, its sets are cleared too.
    #[instrument(skip(self, path))]
    pub async fn remove_from_path(&self, id: LocationId, path: &HierarchyPath) -> Result<Vec<String>> {
        path.validate()?;
        let key = hash_key(id);

        let mut removed_from: Vec<String> = IndexKeys::for_path(id, path)
            .set_keys()
            .map(str::to_string)
            .to_vec();
        if let Some(hash) = self.backend.hash(&key).await?
            && let Ok(cached) = LocationRecord::from_fields(&hash)
            && cached.path != *path
        {
            for set in IndexKeys::for_record(&cached).set_keys() {
                if !removed_from.iter().any(|s| s == set) {
                    removed_from.push(set.to_string());
                }
            }
        }

        let mut batch = Batch::new();
        for set in &removed_from {
            batch.srem(set, &key);
        }
        batch.del(&key);
        self.backend.execute(&batch).await?;

        tracing::debug!(sets = removed_from.len(), "record removed from previous path");
        Ok(removed_from)
    }

    /// Remove a record from its five sets and delete its hash, in one batch.
    ///
    /// Reverse pointers are left in place: they are shared by every record
    /// under the same leaf name and simply expire when no longer written.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: LocationId) -> Result<Removal> {
        let key = hash_key(id);
        let Some(hash) = self.backend.hash(&key).await? else {
            return Err(IndexError::not_found(id));
        };

        let (record, removed_from) = match LocationRecord::from_fields(&hash) {
            Ok(record) => {
                let keys = IndexKeys::for_record(&record);
                let sets = keys.set_keys().map(str::to_string).to_vec();
                (Some(record), sets)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "removing undecodable cached record from ALL only");
                (None, vec![ALL_KEY.to_string()])
            }
        };

        let mut batch = Batch::new();
        for set in &removed_from {
            batch.srem(set, &key);
        }
        batch.del(&key);
        self.backend.execute(&batch).await?;

        tracing::debug!(sets = removed_from.len(), "cached record removed");
        Ok(Removal {
            record,
            removed_from,
        })
    }
}
