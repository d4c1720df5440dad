//! Filters that pick which configured jobs to run.

use backhaul_core::{JobConfig, sanitize_id};

use crate::job::TransferJob;

/// Selects jobs by name and source id.
///
/// Every set filter must match; comparisons ignore case. An empty selector
/// matches every job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSelector {
    /// Exact job name.
    pub name: Option<String>,
    /// Prefix of the source id.
    pub source_starts_with: Option<String>,
    /// Suffix of the source id.
    pub source_ends_with: Option<String>,
}

impl JobSelector {
    /// A selector that matches every job.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_source_starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.source_starts_with = Some(prefix.into());
        self
    }

    pub fn with_source_ends_with(mut self, suffix: impl Into<String>) -> Self {
        self.source_ends_with = Some(suffix.into());
        self
    }

    /// Check if a job matches.
    pub fn matches(&self, job: &TransferJob) -> bool {
        self.matches_parts(job.name(), job.source().id())
    }

    /// Check if a job configuration matches, before it is resolved.
    pub fn matches_config(&self, config: &JobConfig) -> bool {
        self.matches_parts(&config.display_name(), &sanitize_id(&config.source))
    }

    /// The matching jobs, in their original order.
    pub fn select<'a>(&self, jobs: &'a [TransferJob]) -> Vec<&'a TransferJob> {
        jobs.iter().filter(|job| self.matches(job)).collect()
    }

    fn matches_parts(&self, name: &str, source_id: &str) -> bool {
        let name = name.to_lowercase();
        let source_id = source_id.to_lowercase();

        let name_ok = self
            .name
            .as_deref()
            .is_none_or(|wanted| name == wanted.to_lowercase());
        let prefix_ok = self
            .source_starts_with
            .as_deref()
            .is_none_or(|prefix| source_id.starts_with(&prefix.to_lowercase()));
        let suffix_ok = self
            .source_ends_with
            .as_deref()
            .is_none_or(|suffix| source_id.ends_with(&suffix.to_lowercase()));

        name_ok && prefix_ok && suffix_ok
    }
}
