//! Core types for geocache.
//!
//! Everything the index engine, the stores and the HTTP layer agree on lives
//! here: the location record, its hierarchy path, query filters, field
//! patches, and the validation rules that keep derived cache keys well formed.

pub mod error;
pub mod filter;
pub mod patch;
pub mod record;

pub use error::{CoreError, Result};
pub use filter::LocationFilter;
pub use patch::{FieldPatch, LocationPatch};
pub use record::{
    HierarchyLevel, HierarchyPath, LocationId, LocationRecord, NewLocation, RESERVED_COUNTRIES,
    fields, validate_segment,
};
