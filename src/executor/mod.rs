//! Query executor subsystem for nutridb
//!
//! The executor owns the document store and answers every operation:
//! inserts, updates, deletes, find cursors, counts, distinct values,
//! aggregation pipelines, map-reduce and index management.
//!
//! # Execution Flow (strict order)
//!
//! 1. Parse and validate the operation's inputs
//! 2. Resolve the collection
//! 3. Use an index to narrow candidates when one applies
//! 4. Filter candidates in insertion order
//! 5. Apply sort (stable), skip and limit
//! 6. Apply projection
//!
//! # Invariants
//!
//! - Deterministic results: same data and same operation give the same output
//! - Index use never changes results, only the candidates examined
//! - Malformed input fails loudly with a validation error

mod command;
mod cursor;
mod errors;
mod executor;
mod projection;
mod result;
mod sorter;
mod update;

pub use command::{Command, CommandOutcome};
pub use cursor::{Cursor, FindOptions};
pub use errors::{QueryError, QueryErrorCode, QueryResult};
pub use executor::QueryExecutor;
pub use projection::Projection;
pub use result::{InsertManyResult, UpdateResult};
pub use sorter::{SortDirection, SortSpec};
pub use update::UpdateSpec;
