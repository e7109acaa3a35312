//! # hivecase
//!
//! Library half of the hivecase binary: CLI definitions, command
//! implementations and configuration loading. Case construction itself
//! lives in `hivecase-core`.

pub mod cli;
pub mod config;
