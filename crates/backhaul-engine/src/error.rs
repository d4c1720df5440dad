//! Errors that abort a whole run.

use backhaul_core::{DiscoveryError, TransferError};
use thiserror::Error;

/// Fatal run errors.
///
/// Per-item transfer failures are never reported here; they are recorded
/// in the run result instead.
#[derive(Debug, Error)]
pub enum RunError {
    /// The source could not enumerate its items.
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// A step failed to initialize; no item was transferred.
    #[error("Cannot initialize {step}: {source}")]
    Initialize {
        step: String,
        #[source]
        source: TransferError,
    },

    /// A step failed to finish after every item was processed.
    #[error("Cannot terminate {step}: {source}")]
    Terminate {
        step: String,
        #[source]
        source: TransferError,
    },

    /// The worker pool could not be started.
    #[error("Cannot start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
