//! The backup orchestrator.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use backhaul_core::{
    ConfigError, DiscoveryError, FailureCause, Item, ResultCollector, Stage, TransferError,
    TransferResult, effective_attempts, effective_threads,
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::context::RunContext;
use crate::error::RunError;
use crate::events::{ItemFound, Observers, TransferObserver};
use crate::filter::IgnoreFilter;
use crate::naming::{DateNaming, NamingStrategy};
use crate::step::{Destination, ItemIter, Source};

/// A configured backup from one source to one destination.
///
/// A job can be run any number of times; every run gets its own context
/// and result.
#[derive(Clone)]
pub struct TransferJob {
    name: String,
    source: Arc<dyn Source>,
    destination: Arc<dyn Destination>,
    naming: Arc<dyn NamingStrategy>,
    ignore: Option<IgnoreFilter>,
    attempts: u32,
    threads: usize,
    observers: Observers,
}

impl TransferJob {
    /// Create a job with default settings.
    ///
    /// An empty name becomes `{source_id}2{destination_id}`.
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn Source>,
        destination: Arc<dyn Destination>,
    ) -> Self {
        let mut name = name.into();
        if name.trim().is_empty() {
            name = format!("{}2{}", source.id(), destination.id());
        }

        Self {
            name,
            source,
            destination,
            naming: Arc::new(DateNaming),
            ignore: None,
            attempts: effective_attempts(backhaul_core::DEFAULT_MAX_ITEM_RETRIES),
            threads: effective_threads(backhaul_core::DEFAULT_MAX_THREADS),
            observers: Observers::default(),
        }
    }

    /// Set the naming strategy.
    pub fn with_naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    /// Ignore items whose source path matches `pattern`.
    pub fn with_ignore_pattern(self, pattern: &str) -> Result<Self, ConfigError> {
        Ok(self.with_ignore(IgnoreFilter::new(pattern)?))
    }

    /// Set the ignore filter.
    pub fn with_ignore(mut self, filter: IgnoreFilter) -> Self {
        self.ignore = Some(filter);
        self
    }

    /// Set the number of attempts per item. Values below one mean one attempt.
    pub fn with_max_item_retries(mut self, max_item_retries: i32) -> Self {
        self.attempts = effective_attempts(max_item_retries);
        self
    }

    /// Set the number of transfer workers. Values below one mean the default.
    pub fn with_max_threads(mut self, max_threads: i32) -> Self {
        self.threads = effective_threads(max_threads);
        self
    }

    /// Register an observer for item events.
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn destination(&self) -> &Arc<dyn Destination> {
        &self.destination
    }

    /// Attempts each item gets before it is marked failed.
    pub fn max_item_retries(&self) -> u32 {
        self.attempts
    }

    /// Number of transfer workers.
    pub fn max_threads(&self) -> usize {
        self.threads
    }

    /// The ignore pattern, if any.
    pub fn ignore_pattern(&self) -> Option<&str> {
        self.ignore.as_ref().map(IgnoreFilter::as_str)
    }

    /// Run the job now.
    pub fn run(&self) -> Result<TransferResult, RunError> {
        self.run_at(Utc::now())
    }

    /// Run the job as if it started at `started_at`.
    ///
    /// The start time only feeds the naming strategy; elapsed time is still
    /// measured on the wall clock.
    pub fn run_at(&self, started_at: DateTime<Utc>) -> Result<TransferResult, RunError> {
        let start = Instant::now();
        let context = RunContext::new(
            self.name.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.destination),
            Arc::clone(&self.naming),
            started_at,
        );

        info!(
            job = %self.name,
            source = self.source.id(),
            destination = self.destination.id(),
            root = context.naming_root(),
            threads = self.threads,
            attempts = self.attempts,
            "starting backup"
        );

        self.initialize(&context)?;

        let collector = ResultCollector::new();
        let transferred = self.transfer_all(&context, &collector);
        let terminated = self.terminate(&context);

        // A discovery failure is reported before a termination failure
        if let Err(e) = transferred {
            error!(job = %self.name, error = %e, "backup aborted");
            return Err(e);
        }
        terminated?;

        let result = collector.finish(start.elapsed());
        info!(
            job = %self.name,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "backup finished: {}",
            result.summary()
        );
        Ok(result)
    }

    fn initialize(&self, context: &RunContext) -> Result<(), RunError> {
        self.source
            .initialize(context)
            .map_err(|source| initialize_error(self.source.id(), source))?;

        if let Err(source) = self.destination.initialize(context) {
            if let Err(e) = self.source.terminate(context) {
                warn!(step = self.source.id(), error = %e, "failed to terminate source");
            }
            return Err(initialize_error(self.destination.id(), source));
        }

        Ok(())
    }

    fn terminate(&self, context: &RunContext) -> Result<(), RunError> {
        let source = self.source.terminate(context);
        let destination = self.destination.terminate(context);

        source.map_err(|source| terminate_error(self.source.id(), source))?;
        destination.map_err(|source| terminate_error(self.destination.id(), source))
    }

    fn transfer_all(
        &self,
        context: &RunContext,
        collector: &ResultCollector,
    ) -> Result<(), RunError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("backhaul-worker-{i}"))
            .build()?;

        let discovery = Discovery {
            items: self.source.items()?,
            ignore: self.ignore.as_ref(),
            observers: &self.observers,
            collector,
            done: false,
        };

        pool.install(|| {
            discovery.par_bridge().try_for_each(|found| {
                let item = found?;
                self.transfer_item(context, collector, &item);
                Ok::<(), DiscoveryError>(())
            })
        })?;

        Ok(())
    }

    fn transfer_item(&self, context: &RunContext, collector: &ResultCollector, item: &Item) {
        if self.ignore.as_ref().is_some_and(|filter| filter.is_match(item)) {
            if collector.register_ignored(item) {
                self.observers.item_ignored(item);
            }
            return;
        }

        let mut causes = Vec::new();
        for attempt in 1..=self.attempts {
            self.observers.item_copying(item, attempt);

            match self.copy_once(context, item) {
                Ok(()) => {
                    self.observers.item_copied(item);
                    collector.register_success(item);
                    return;
                }
                Err((stage, e)) => {
                    warn!(
                        item = %item,
                        attempt,
                        stage = %stage,
                        error = %e,
                        "transfer attempt failed"
                    );
                    let cause = FailureCause::from_error(attempt, stage, &e);
                    self.observers.item_failed(item, &cause, attempt == self.attempts);
                    causes.push(cause);
                }
            }
        }

        error!(item = %item, attempts = self.attempts, "giving up on item");
        collector.register_failed(item, causes);
    }

    fn copy_once(&self, context: &RunContext, item: &Item) -> Result<(), (Stage, TransferError)> {
        let data = guarded(|| self.source.read_item(item)).map_err(|e| (Stage::Read, e))?;

        let path = item.assign_destination(|| context.full_name(item));
        debug!(item = %item, destination = path, bytes = data.len(), "storing");

        guarded(|| self.destination.store_item(item, &data)).map_err(|e| (Stage::Store, e))?;
        self.observers.item_stored(item, self.destination.id());
        Ok(())
    }
}

impl fmt::Debug for TransferJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferJob")
            .field("name", &self.name)
            .field("source", &self.source.id())
            .field("destination", &self.destination.id())
            .field("ignore", &self.ignore_pattern())
            .field("attempts", &self.attempts)
            .field("threads", &self.threads)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Wraps a source's item iterator with the discovery-time ignore decision.
///
/// Ignored items are recorded here and never reach a worker.
struct Discovery<'a> {
    items: ItemIter<'a>,
    ignore: Option<&'a IgnoreFilter>,
    observers: &'a Observers,
    collector: &'a ResultCollector,
    done: bool,
}

impl Iterator for Discovery<'_> {
    type Item = Result<Item, DiscoveryError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let item = match self.items.next() {
                Some(Ok(item)) => item,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            };

            let matched = self.ignore.is_some_and(|filter| filter.is_match(&item));
            let mut found = ItemFound::new(&item, matched);
            self.observers.item_found(&mut found);

            if !found.is_ignored() {
                return Some(Ok(item));
            }
            if self.collector.register_ignored(&item) {
                self.observers.item_ignored(&item);
            }
        }
        None
    }
}

/// Run an adapter call, turning a panic into a transfer error.
fn guarded<T>(op: impl FnOnce() -> Result<T, TransferError>) -> Result<T, TransferError> {
    panic::catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|payload| {
        Err(TransferError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn initialize_error(step: &str, source: TransferError) -> RunError {
    error!(step, error = %source, "initialization failed");
    RunError::Initialize {
        step: step.to_string(),
        source,
    }
}

fn terminate_error(step: &str, source: TransferError) -> RunError {
    error!(step, error = %source, "termination failed");
    RunError::Terminate {
        step: step.to_string(),
        source,
    }
}
