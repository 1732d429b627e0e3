//! Map-reduce
//!
//! A two-phase fold over the documents matching a query:
//!
//! 1. Map: each document emits zero or more `(key, value)` pairs
//! 2. Reduce: values sharing a key are folded into one value
//!
//! Output documents have the shape `{_id: key, value: reduced}` and are
//! ordered by key collation, independent of input order.
//!
//! # Usage
//!
//! ```ignore
//! // emit(this.ID, this.Iron) with a summing reducer
//! let result = executor.map_reduce(
//!     "Food",
//!     MapFn::emit("$ID", "$Iron")?,
//!     ReduceFn::Sum,
//!     MapReduceOptions::replace("IronContent").query(json!({"Calories": 367})),
//! )?;
//! ```

mod job;
mod mapper;
mod reducer;

pub use job::{JobOutput, MapReduceJob, MapReduceOptions, MapReduceOutput, MapReduceResult};
pub use mapper::{EmitSpec, Emitter, MapFn};
pub use reducer::{BuiltinReducer, ReduceFn};
