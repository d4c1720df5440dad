//! Destination naming strategies.

use std::fmt;
use std::sync::Arc;

use backhaul_core::{NamingKind, paths};
use chrono::{DateTime, Utc};

/// Decides where items land on the destination.
///
/// Both methods must be deterministic: the same inputs always give the
/// same path.
pub trait NamingStrategy: Send + Sync {
    /// Root folder for one run of a source.
    fn root_path(&self, source_id: &str, started_at: DateTime<Utc>) -> String;

    /// Full destination path of an item below the run root.
    fn full_name(&self, root: &str, relative: &str) -> String {
        paths::combine(root, relative)
    }
}

/// `{source_id}/{yyyyMMdd-HHmm}`, one folder per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateNaming;

impl NamingStrategy for DateNaming {
    fn root_path(&self, source_id: &str, started_at: DateTime<Utc>) -> String {
        paths::combine(source_id, &started_at.format("%Y%m%d-%H%M").to_string())
    }
}

/// `{source_id}`, every run overwrites the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceIdNaming;

impl NamingStrategy for SourceIdNaming {
    fn root_path(&self, source_id: &str, _started_at: DateTime<Utc>) -> String {
        source_id.to_string()
    }
}

/// The strategy implementing a built-in naming kind.
pub fn strategy_for(kind: NamingKind) -> Arc<dyn NamingStrategy> {
    match kind {
        NamingKind::Date => Arc::new(DateNaming),
        NamingKind::SourceId => Arc::new(SourceIdNaming),
    }
}

/// A naming strategy bound to one run, with its root computed once.
#[derive(Clone)]
pub struct ResolvedNaming {
    strategy: Arc<dyn NamingStrategy>,
    root: String,
}

impl ResolvedNaming {
    /// Bind a strategy to a source and start time.
    pub fn new(
        strategy: Arc<dyn NamingStrategy>,
        source_id: &str,
        started_at: DateTime<Utc>,
    ) -> Self {
        let root = strategy.root_path(source_id, started_at);
        Self { strategy, root }
    }

    /// Root folder of the run.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Full destination path for a path relative to the source root.
    pub fn full_name(&self, relative: &str) -> String {
        self.strategy.full_name(&self.root, relative)
    }
}

impl fmt::Debug for ResolvedNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedNaming")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn started_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 42).unwrap()
    }

    #[test]
    fn test_date_naming_root() {
        assert_eq!(DateNaming.root_path("docs", started_at()), "docs/20240307-0905");
    }

    #[test]
    fn test_source_id_naming_root() {
        assert_eq!(SourceIdNaming.root_path("docs", started_at()), "docs");
    }

    #[test]
    fn test_full_name_is_deterministic() {
        let naming = ResolvedNaming::new(strategy_for(NamingKind::Date), "docs", started_at());
        let first = naming.full_name("/A/x.txt");
        let second = naming.full_name("/A/x.txt");
        assert_eq!(first, "docs/20240307-0905/A/x.txt");
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_name_collapses_separators() {
        let naming = ResolvedNaming::new(Arc::new(SourceIdNaming), "docs", started_at());
        assert_eq!(naming.full_name(r"\A\\x.txt"), "docs/A/x.txt");
    }
}
