//! Per-run context shared by the engine and its adapters.

use std::fmt;
use std::sync::Arc;

use backhaul_core::Item;
use chrono::{DateTime, Utc};

use crate::naming::{NamingStrategy, ResolvedNaming};
use crate::step::{Destination, Source};

/// Everything a run knows about itself.
///
/// Created once at the start of a run and passed unchanged to every
/// lifecycle call.
#[derive(Clone)]
pub struct RunContext {
    job_name: String,
    source: Arc<dyn Source>,
    destination: Arc<dyn Destination>,
    naming: ResolvedNaming,
    started_at: DateTime<Utc>,
}

impl RunContext {
    /// Create the context of a run.
    pub fn new(
        job_name: impl Into<String>,
        source: Arc<dyn Source>,
        destination: Arc<dyn Destination>,
        naming: Arc<dyn NamingStrategy>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let naming = ResolvedNaming::new(naming, source.id(), started_at);
        Self {
            job_name: job_name.into(),
            source,
            destination,
            naming,
            started_at,
        }
    }

    /// Name of the running job.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    pub fn destination(&self) -> &dyn Destination {
        self.destination.as_ref()
    }

    /// When the run started. Fixed for the whole run.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Root folder of this run on the destination.
    pub fn naming_root(&self) -> &str {
        self.naming.root()
    }

    /// Full destination path of an item.
    pub fn full_name(&self, item: &Item) -> String {
        self.naming.full_name(&self.source.relative_path(item))
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("job_name", &self.job_name)
            .field("source", &self.source.id())
            .field("destination", &self.destination.id())
            .field("naming", &self.naming)
            .field("started_at", &self.started_at)
            .finish()
    }
}
