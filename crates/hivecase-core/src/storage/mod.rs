//! # Storage Module
//!
//! Durable relational tables for a case, backed by redb.

mod redb_store;

pub use redb_store::{CommitStats, RelationalStore};
