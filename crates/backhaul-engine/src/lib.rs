//! Backup orchestration engine for backhaul.
//!
//! A [`TransferJob`] moves every item a [`Source`] discovers to a
//! [`Destination`], naming each item with a [`NamingStrategy`]:
//!
//! 1. Build the [`RunContext`] and initialize source, then destination.
//! 2. Discover items one at a time. Each found item is offered to the
//!    ignore filter and the registered observers, which decide whether it
//!    is ignored before it is handed to the workers.
//! 3. Transfer the remaining items on a bounded worker pool, retrying each
//!    failed item up to its retry budget.
//! 4. Terminate both steps and return the [`TransferResult`].
//!
//! Item failures never abort a run; only discovery, lifecycle, and worker
//! pool errors do.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use backhaul_engine::{TransferJob, TracingObserver};
//!
//! let job = TransferJob::new("nightly", source, destination)
//!     .with_ignore_pattern(r"\.tmp$")?
//!     .with_max_threads(8)
//!     .with_observer(Arc::new(TracingObserver));
//!
//! let result = job.run()?;
//! println!("{}", result.summary());
//! ```

mod context;
mod error;
mod events;
mod filter;
mod job;
mod naming;
mod registry;
mod selection;
mod step;

pub use context::RunContext;
pub use error::RunError;
pub use events::{EventBroadcaster, ItemFound, TracingObserver, TransferEvent, TransferObserver};
pub use filter::IgnoreFilter;
pub use job::TransferJob;
pub use naming::{DateNaming, NamingStrategy, ResolvedNaming, SourceIdNaming, strategy_for};
pub use registry::StepRegistry;
pub use selection::JobSelector;
pub use step::{Destination, ItemIter, Source, destination_path};

// Re-export core types for convenience
pub use backhaul_core::{
    ConfigError, DiscoveryError, FailureCause, Item, ItemKind, ItemStats, JobConfig, LookupError,
    NamingKind, Stage, TransferError, TransferResult,
};

/// Default capacity of the event broadcast channel.
pub const EVENT_CHANNEL_SIZE: usize = 100;
