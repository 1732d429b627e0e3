//! Aggregation pipelines
//!
//! A pipeline is an ordered array of stages. Each stage consumes the output
//! of the previous one:
//!
//! ```text
//! [{"$match": {"Calories": {"$gt": 100}}},
//!  {"$group": {"_id": "", "avg": {"$avg": "$Calories"}}}]
//! ```
//!
//! Supported stages: `$match`, `$project`, `$group`, `$sort`, `$limit`,
//! `$skip`, `$lookup`, `$unwind`, `$count` and `$indexStats`.

mod accumulator;
mod expression;
mod pipeline;
mod stage;

pub use accumulator::{Accumulator, AccumulatorOp, AccumulatorState};
pub use expression::{Expression, Operator};
pub use pipeline::Pipeline;
pub use stage::{GroupSpec, LookupSpec, Stage, UnwindSpec};

pub(crate) use accumulator::numeric_input;
