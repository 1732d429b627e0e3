//! Index subsystem for nutridb
//!
//! Indexes are derived, in-memory state mirroring a collection's documents.
//!
//! # Design Principles
//!
//! - Derived state: indexes mirror the collection, never the source of truth
//! - Deterministic: BTreeMap iteration order, sorted sequence numbers
//! - Every collection carries the unique `_id_` index
//!
//! # Invariants
//!
//! - Unique checks run BEFORE a write is committed
//! - Index updates occur AFTER the document is stored
//! - Lookups return sequence numbers sorted ascending (insertion order)
//! - Using an index never changes the result of a query

mod btree;
mod catalog;
mod spec;

pub use btree::{DocSeq, IndexKey, IndexTree};
pub use catalog::{IndexCatalog, IndexEntry, ID_INDEX_NAME};
pub use spec::{IndexDescription, IndexDirection, IndexOptions, IndexSpec};
