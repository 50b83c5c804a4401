//! kodit's background work pipeline: a persistent priority queue, the
//! prescribed commit-indexing pipelines, a worker runtime, and a
//! hierarchical progress tracker.

pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;
pub mod worker;
