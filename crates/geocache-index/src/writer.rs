//! Index writer: one record in, every derived key out.

use std::time::Duration;

use geocache_core::LocationRecord;
use tracing::instrument;

use crate::backend::CacheBackend;
use crate::batch::Batch;
use crate::error::Result;
use crate::keys::IndexKeys;

/// Writes records and all their derived index entries.
#[derive(Debug, Clone)]
pub struct IndexWriter {
    backend: CacheBackend,
    ttl: Duration,
}

impl IndexWriter {
    pub fn new(backend: CacheBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build the batch for `records` without sending it.
    ///
    /// Every record is validated first, so a malformed record leaves the
    /// batch unbuilt rather than half-built.
    pub fn plan(&self, records: &[LocationRecord]) -> Result<Batch> {
        for record in records {
            record.validate()?;
        }

        let mut batch = Batch::new();
        for record in records {
            let keys = IndexKeys::for_record(record);

            batch
                .hset(&keys.hash, record.to_fields())
                .expire(&keys.hash, self.ttl);

            for set in keys.set_keys() {
                batch.sadd(set, &keys.hash).expire(set, self.ttl);
            }

            for pointer in keys.reverse_pointers() {
                batch
                    .set(&pointer.key, &pointer.target)
                    .expire(&pointer.key, self.ttl);
            }
        }
        Ok(batch)
    }

    /// Index `records` in a single pipelined round trip.
    ///
    /// Overwrites existing hashes and reverse pointers and refreshes the TTL
    /// of every touched key. Not atomic: a transport failure mid-batch may
    /// leave some commands applied.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn index(&self, records: &[LocationRecord]) -> Result<()> {
        let batch = self.plan(records)?;
        if batch.is_empty() {
            return Ok(());
        }
        self.backend.execute(&batch).await?;
        tracing::debug!(commands = batch.len(), "records indexed");
        Ok(())
    }
}
