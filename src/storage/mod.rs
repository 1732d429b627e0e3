//! Document storage subsystem for nutridb
//!
//! The store holds every named collection in memory. It is the only owner
//! of documents; indexes and cursors are derived from it.
//!
//! # Design Principles
//!
//! - Documents are addressed by a per-collection sequence number that never
//!   changes while the document lives
//! - Iteration follows sequence order, which is insertion order
//! - Full-document writes: a document is replaced as a whole
//!
//! # Invariants Enforced
//!
//! - Every stored document has an `_id`
//! - Unique indexes are checked before a write becomes visible

mod collection;
mod store;

pub use collection::{Collection, ScanPlan};
pub use store::DocumentStore;
