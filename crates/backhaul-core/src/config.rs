//! Job configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default number of transfer attempts per item.
pub const DEFAULT_MAX_ITEM_RETRIES: i32 = 100;

/// Default number of transfer workers.
pub const DEFAULT_MAX_THREADS: i32 = 20;

/// Built-in destination naming policies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NamingKind {
    /// `{source_id}/{yyyyMMdd-HHmm}` from the run's start time.
    #[default]
    Date,
    /// `{source_id}` only.
    SourceId,
}

/// Configuration of one backup job.
///
/// Jobs reference previously declared sources and destinations by id, so
/// several jobs can share the same instances.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct JobConfig {
    /// Job name. Empty means `{source}2{destination}`.
    #[builder(default)]
    #[serde(default)]
    pub name: String,

    /// Id of the source to read from.
    pub source: String,

    /// Id of the destination to write to.
    pub destination: String,

    /// Regular expression matched against source paths; matches are ignored.
    #[builder(default)]
    #[serde(default)]
    pub ignore_pattern: Option<String>,

    /// Attempts per item before it is marked failed (<= 0 means one attempt).
    #[builder(default = "DEFAULT_MAX_ITEM_RETRIES")]
    #[serde(default = "default_max_item_retries")]
    pub max_item_retries: i32,

    /// Number of transfer workers (<= 0 means the default).
    #[builder(default = "DEFAULT_MAX_THREADS")]
    #[serde(default = "default_max_threads")]
    pub max_threads: i32,

    /// Destination naming policy.
    #[builder(default)]
    #[serde(default)]
    pub naming: NamingKind,
}

fn default_max_item_retries() -> i32 {
    DEFAULT_MAX_ITEM_RETRIES
}

fn default_max_threads() -> i32 {
    DEFAULT_MAX_THREADS
}

impl JobConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.source {
            Some(ref source) if !source.trim().is_empty() => {}
            _ => return Err("Source id is required".to_string()),
        }
        match self.destination {
            Some(ref destination) if !destination.trim().is_empty() => {}
            _ => return Err("Destination id is required".to_string()),
        }
        Ok(())
    }
}

impl JobConfig {
    /// Create a new job config builder.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder::default()
    }

    /// Create a config with default settings.
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            source: source.into(),
            destination: destination.into(),
            ignore_pattern: None,
            max_item_retries: DEFAULT_MAX_ITEM_RETRIES,
            max_threads: DEFAULT_MAX_THREADS,
            naming: NamingKind::default(),
        }
    }

    /// The job name, falling back to `{source}2{destination}`.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("{}2{}", self.source, self.destination)
        } else {
            self.name.clone()
        }
    }

    /// Number of attempts each item gets.
    pub fn attempts(&self) -> u32 {
        effective_attempts(self.max_item_retries)
    }

    /// Number of transfer workers to start.
    pub fn threads(&self) -> usize {
        effective_threads(self.max_threads)
    }
}

/// Normalize a configured retry budget to a number of attempts.
pub fn effective_attempts(max_item_retries: i32) -> u32 {
    u32::try_from(max_item_retries).unwrap_or(0).max(1)
}

/// Normalize a configured worker count.
pub fn effective_threads(max_threads: i32) -> usize {
    match usize::try_from(max_threads) {
        Ok(n) if n > 0 => n,
        _ => DEFAULT_MAX_THREADS as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = JobConfig::builder()
            .source("docs")
            .destination("archive")
            .ignore_pattern(Some(r"\.tmp$".to_string()))
            .max_threads(4)
            .naming(NamingKind::SourceId)
            .build()
            .unwrap();

        assert_eq!(config.source, "docs");
        assert_eq!(config.max_threads, 4);
        assert_eq!(config.max_item_retries, DEFAULT_MAX_ITEM_RETRIES);
        assert_eq!(config.naming, NamingKind::SourceId);
    }

    #[test]
    fn test_config_builder_requires_steps() {
        assert!(JobConfig::builder().source("docs").build().is_err());
        assert!(JobConfig::builder().destination("zip").build().is_err());
        assert!(
            JobConfig::builder()
                .source(" ")
                .destination("zip")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_display_name() {
        let mut config = JobConfig::new("MySource", "MyDestination");
        assert_eq!(config.display_name(), "MySource2MyDestination");

        config.name = "nightly".to_string();
        assert_eq!(config.display_name(), "nightly");
    }

    #[test]
    fn test_normalized_limits() {
        assert_eq!(effective_threads(0), 20);
        assert_eq!(effective_threads(-3), 20);
        assert_eq!(effective_threads(8), 8);
        assert_eq!(effective_attempts(0), 1);
        assert_eq!(effective_attempts(-1), 1);
        assert_eq!(effective_attempts(3), 3);

        let mut config = JobConfig::new("docs", "zip");
        config.max_threads = -1;
        config.max_item_retries = 0;
        assert_eq!(config.threads(), 20);
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn test_naming_kind_parse() {
        assert_eq!("source-id".parse::<NamingKind>().unwrap(), NamingKind::SourceId);
        assert_eq!(NamingKind::Date.to_string(), "date");
    }
}
