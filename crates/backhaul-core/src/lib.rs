//! Core types for backhaul.
//!
//! This crate provides the data structures shared by the engine and the
//! adapters: backup items, per-kind statistics, the concurrent result
//! collector, job configuration, and the error taxonomy.

mod config;
mod error;
mod item;
pub mod paths;
mod result;
mod stats;

pub use config::{
    DEFAULT_MAX_ITEM_RETRIES, DEFAULT_MAX_THREADS, JobConfig, JobConfigBuilder, NamingKind,
    effective_attempts, effective_threads,
};
pub use error::{ConfigError, DiscoveryError, LookupError, TransferError};
pub use item::{Item, ItemKind};
pub use paths::sanitize_id;
pub use result::{ResultCollector, TransferResult};
pub use stats::{FailureCause, ItemStats, Stage};
