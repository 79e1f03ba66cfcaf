//! # geocache-storage
//!
//! Backing store abstraction for geocache.
//!
//! The main trait is [`LocationStore`], the durable source of truth the cache
//! index sits in front of. This crate also ships [`InMemoryLocationStore`],
//! a normalized in-process implementation used by tests and by the server's
//! `memory` storage backend. The PostgreSQL implementation lives in
//! `geocache-db-postgres`.
//!
//! ## Example
//!
//! ```ignore
//! use geocache_core::LocationFilter;
//! use geocache_storage::{InMemoryLocationStore, LocationStore};
//!
//! let store = InMemoryLocationStore::new();
//! let in_pune = store
//!     .query_records(&LocationFilter::City("Pune".into()))
//!     .await?;
//! ```

mod error;
mod memory;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use memory::InMemoryLocationStore;
pub use traits::{LocationStore, UpdateOutcome};
