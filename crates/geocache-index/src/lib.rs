//! Hierarchical location index.
//!
//! Every record is stored as a hash under `record:<id>` and is a member of
//! five sets, one per hierarchy depth:
//!
//! ```text
//! ALL
//! <country>
//! <country>:<state>
//! <country>:<state>:<city>
//! <country>:<state>:<city>:<area>
//! ```
//!
//! Reverse pointers (`reverse:state:<state>` and so on) map a bare name to
//! its ancestor prefix, so a query by state, city or area is one pointer
//! lookup plus one set read. Every key written for a record gets the same
//! TTL, reset on each write.
//!
//! [`LocationIndex`] bundles the writer, reader and mutator over one shared
//! [`CacheBackend`].

pub mod backend;
pub mod batch;
pub mod error;
pub mod keys;
pub mod mutator;
pub mod reader;
pub mod writer;

use std::time::Duration;

use geocache_core::{FieldPatch, HierarchyPath, LocationFilter, LocationId, LocationRecord};

pub use backend::{CacheBackend, LocalIndexStore};
pub use batch::{Batch, Command};
pub use error::{IndexError, Result};
pub use keys::IndexKeys;
pub use mutator::{IndexMutator, Removal};
pub use reader::IndexReader;
pub use writer::IndexWriter;

/// Default time to live of every index key: one day.
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Facade over the index components.
#[derive(Debug, Clone)]
pub struct LocationIndex {
    backend: CacheBackend,
    writer: IndexWriter,
    reader: IndexReader,
    mutator: IndexMutator,
}

impl LocationIndex {
    pub fn new(backend: CacheBackend, ttl: Duration) -> Self {
        Self {
            writer: IndexWriter::new(backend.clone(), ttl),
            reader: IndexReader::new(backend.clone()),
            mutator: IndexMutator::new(backend.clone(), ttl),
            backend,
        }
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    pub fn ttl(&self) -> Duration {
        self.writer.ttl()
    }

    pub async fn index(&self, records: &[LocationRecord]) -> Result<()> {
        self.writer.index(records).await
    }

    pub async fn query(&self, filter: &LocationFilter) -> Result<Vec<LocationRecord>> {
        self.reader.query(filter).await
    }

    pub async fn fetch(&self, id: LocationId) -> Result<Option<LocationRecord>> {
        self.reader.fetch(id).await
    }

    pub async fn patch_fields<I, K, V>(&self, id: LocationId, fields: I) -> Result<LocationRecord>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.mutator.patch_fields(id, fields).await
    }

    pub async fn apply_patch(&self, id: LocationId, patch: &FieldPatch) -> Result<LocationRecord> {
        self.mutator.apply_patch(id, patch).await
    }

    pub async fn remove(&self, id: LocationId) -> Result<Removal> {
        self.mutator.remove(id).await
    }

    pub async fn remove_from_path(&self, id: LocationId, path: &HierarchyPath) -> Result<Vec<String>> {
        self.mutator.remove_from_path(id, path).await
    }
}
