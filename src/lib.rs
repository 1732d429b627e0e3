//! nutridb - A deterministic in-memory document query executor
//!
//! Stores schemaless JSON documents in named collections and answers
//! filter queries, updates, aggregation pipelines, map-reduce jobs and index
//! management over them.
//!
//! ```ignore
//! use nutridb::executor::{FindOptions, QueryExecutor};
//! use serde_json::json;
//!
//! let mut db = QueryExecutor::new();
//! db.insert_one("Food", json!({"ID": 93601, "Description": "Sample Food"}))?;
//! let rich: Vec<_> = db
//!     .find("Food", &json!({"Sodium": {"$gt": 10000}}), FindOptions::new().limit(10))?
//!     .collect();
//! ```

pub mod aggregation;
pub mod config;
pub mod document;
pub mod executor;
pub mod filter;
pub mod index;
pub mod mapreduce;
pub mod observability;
pub mod storage;
