//! Lookup of declared sources and destinations by id.

use std::sync::Arc;

use backhaul_core::{ConfigError, JobConfig, sanitize_id};
use indexmap::IndexMap;

use crate::filter::IgnoreFilter;
use crate::job::TransferJob;
use crate::naming::strategy_for;
use crate::step::{Destination, Source};

/// The sources and destinations declared by a configuration.
///
/// Ids are sanitized and compared case-insensitively. Steps are shared:
/// every job that references an id gets the same instance.
#[derive(Default, Clone)]
pub struct StepRegistry {
    sources: IndexMap<String, Arc<dyn Source>>,
    destinations: IndexMap<String, Arc<dyn Destination>>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a source. Fails if another source has the same id.
    pub fn register_source(&mut self, source: Arc<dyn Source>) -> Result<(), ConfigError> {
        let key = registry_key(source.id());
        if self.sources.contains_key(&key) {
            return Err(ConfigError::DuplicateId {
                role: "source",
                id: source.id().to_string(),
            });
        }
        self.sources.insert(key, source);
        Ok(())
    }

    /// Declare a destination. Fails if another destination has the same id.
    pub fn register_destination(
        &mut self,
        destination: Arc<dyn Destination>,
    ) -> Result<(), ConfigError> {
        let key = registry_key(destination.id());
        if self.destinations.contains_key(&key) {
            return Err(ConfigError::DuplicateId {
                role: "destination",
                id: destination.id().to_string(),
            });
        }
        self.destinations.insert(key, destination);
        Ok(())
    }

    /// Find a source by id.
    pub fn source(&self, id: &str) -> Result<Arc<dyn Source>, ConfigError> {
        self.sources
            .get(&registry_key(id))
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSource { id: id.to_string() })
    }

    /// Find a destination by id.
    pub fn destination(&self, id: &str) -> Result<Arc<dyn Destination>, ConfigError> {
        self.destinations
            .get(&registry_key(id))
            .cloned()
            .ok_or_else(|| ConfigError::UnknownDestination { id: id.to_string() })
    }

    /// Every declared source, in declaration order.
    pub fn sources(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.values()
    }

    /// Every declared destination, in declaration order.
    pub fn destinations(&self) -> impl Iterator<Item = &Arc<dyn Destination>> {
        self.destinations.values()
    }

    /// Build the job a configuration describes.
    pub fn resolve(&self, config: &JobConfig) -> Result<TransferJob, ConfigError> {
        let source = self.source(&config.source)?;
        let destination = self.destination(&config.destination)?;

        let mut job = TransferJob::new(config.name.clone(), source, destination)
            .with_naming(strategy_for(config.naming))
            .with_max_item_retries(config.max_item_retries)
            .with_max_threads(config.max_threads);

        if let Some(pattern) = config.ignore_pattern.as_deref().filter(|p| !p.is_empty()) {
            job = job.with_ignore(IgnoreFilter::new(pattern)?);
        }

        Ok(job)
    }

    /// Build every job, stopping at the first configuration error.
    pub fn resolve_all<'a>(
        &self,
        configs: impl IntoIterator<Item = &'a JobConfig>,
    ) -> Result<Vec<TransferJob>, ConfigError> {
        configs.into_iter().map(|config| self.resolve(config)).collect()
    }
}

fn registry_key(id: &str) -> String {
    sanitize_id(id).to_lowercase()
}
