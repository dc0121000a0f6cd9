//! # Memory Store
//!
//! In-process retention of healthcheck results.
//!
//! Keeps the latest result of each healthcheck, bounded by
//! `StoreConfig::max_entries`, and optionally purges results older than
//! `StoreConfig::ttl_secs` from a background task.

mod store;

pub use contracts::{ResultStore, StoreConfig};
pub use store::MemoryStore;
