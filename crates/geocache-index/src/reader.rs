//! Index reader: resolve a filter to one set key, then dereference members.

use geocache_core::{HierarchyLevel, LocationFilter, LocationId, LocationRecord};
use tracing::instrument;

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::keys::{ALL_KEY, compose, hash_key, reverse_key};

#[derive(Debug, Clone)]
pub struct IndexReader {
    backend: CacheBackend,
}

impl IndexReader {
    pub fn new(backend: CacheBackend) -> Self {
        Self { backend }
    }

    /// Follow a reverse pointer: the ancestor prefix last written for `name`
    /// at `level`.
    pub async fn reverse_lookup(&self, level: HierarchyLevel, name: &str) -> Result<Option<String>> {
        self.backend.get(&reverse_key(level, name)).await
    }

    /// The set key serving `filter`, or `None` when a state/city/area name
    /// has no reverse pointer (unknown to the cache).
    pub async fn resolve(&self, filter: &LocationFilter) -> Result<Option<String>> {
        filter.validate()?;
        let key = match filter {
            LocationFilter::All => Some(ALL_KEY.to_string()),
            LocationFilter::Country(country) => Some(country.clone()),
            LocationFilter::State(name) => self
                .reverse_lookup(HierarchyLevel::State, name)
                .await?
                .map(|prefix| compose(&prefix, name)),
            LocationFilter::City(name) => self
                .reverse_lookup(HierarchyLevel::City, name)
                .await?
                .map(|prefix| compose(&prefix, name)),
            LocationFilter::Area(name) => self
                .reverse_lookup(HierarchyLevel::Area, name)
                .await?
                .map(|prefix| compose(&prefix, name)),
        };
        Ok(key)
    }

    /// All cached records under `filter`, sorted by id.
    ///
    /// An empty result means either "nothing there" or "not cached"; the
    /// reader cannot tell them apart. Members whose hash has expired or does
    /// not decode are skipped.
    #[instrument(skip(self), fields(filter = %filter))]
    pub async fn query(&self, filter: &LocationFilter) -> Result<Vec<LocationRecord>> {
        let Some(set_key) = self.resolve(filter).await? else {
            tracing::debug!("no reverse pointer");
            return Ok(Vec::new());
        };

        let members = self.backend.members(&set_key).await?;
        if members.is_empty() {
            tracing::debug!(set_key = %set_key, "empty set");
            return Ok(Vec::new());
        }

        let hashes = self.backend.hashes(&members).await?;
        let mut records: Vec<LocationRecord> = members
            .iter()
            .zip(hashes)
            .filter_map(|(member, hash)| {
                let hash = hash?;
                match LocationRecord::from_fields(&hash) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(key = %member, error = %e, "skipping undecodable cached record");
                        None
                    }
                }
            })
            .collect();
        records.sort_by_key(|r| r.id);

        tracing::debug!(
            set_key = %set_key,
            members = members.len(),
            records = records.len(),
            "index query"
        );
        Ok(records)
    }

    /// A single cached record.
    pub async fn fetch(&self, id: LocationId) -> Result<Option<LocationRecord>> {
        let key = hash_key(id);
        let Some(hash) = self.backend.hash(&key).await? else {
            return Ok(None);
        };
        match LocationRecord::from_fields(&hash) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "undecodable cached record");
                Ok(None)
            }
        }
    }
}
