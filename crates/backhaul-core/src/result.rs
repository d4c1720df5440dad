//! Run results and the concurrent collector that builds them.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemKind};
use crate::stats::{FailureCause, ItemStats};

/// The outcome of one backup run, partitioned by item kind.
///
/// Read-only once returned by the run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    /// Wall time spent by the run.
    pub elapsed: Duration,
    /// Folder statistics.
    pub folders: ItemStats,
    /// File statistics.
    pub files: ItemStats,
}

impl TransferResult {
    /// Create an empty result.
    pub fn empty() -> Self {
        Self {
            elapsed: Duration::ZERO,
            folders: ItemStats::new(ItemKind::Folder),
            files: ItemStats::new(ItemKind::File),
        }
    }

    /// Statistics for one item kind.
    pub fn stats(&self, kind: ItemKind) -> &ItemStats {
        match kind {
            ItemKind::File => &self.files,
            ItemKind::Folder => &self.folders,
        }
    }

    /// Check if any item failed.
    pub fn has_failures(&self) -> bool {
        self.files.has_failures() || self.folders.has_failures()
    }

    /// Total number of successfully stored items.
    pub fn success_count(&self) -> u64 {
        self.files.success_count + self.folders.success_count
    }

    /// Get a human-readable one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} stored, {} ignored, {} failed",
            self.success_count(),
            self.files.ignored_count() + self.folders.ignored_count(),
            self.files.failed_count() + self.folders.failed_count()
        )
    }
}

impl Default for TransferResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// Thread-safe accumulator for a run in progress.
///
/// A single lock covers both kinds and every register operation, so the
/// totals are always consistent. Each run owns its collector; independent
/// runs never share one.
#[derive(Debug)]
pub struct ResultCollector {
    inner: Mutex<TransferResult>,
}

impl ResultCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TransferResult::empty()),
        }
    }

    /// Count an item as successfully stored.
    pub fn register_success(&self, item: &Item) {
        let mut result = self.lock();
        stats_mut(&mut result, item.kind()).register_success();
    }

    /// Register an item as ignored.
    ///
    /// Returns `true` only the first time the item key is registered.
    pub fn register_ignored(&self, item: &Item) -> bool {
        let mut result = self.lock();
        stats_mut(&mut result, item.kind()).register_ignored(item.source_path())
    }

    /// Register an item as failed with the causes of its attempts.
    pub fn register_failed(&self, item: &Item, causes: impl IntoIterator<Item = FailureCause>) {
        let mut result = self.lock();
        stats_mut(&mut result, item.kind()).register_failed(item.source_path(), causes);
    }

    /// Finish collecting and stamp the elapsed time.
    pub fn finish(self, elapsed: Duration) -> TransferResult {
        let mut result = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        result.elapsed = elapsed;
        result
    }

    fn lock(&self) -> MutexGuard<'_, TransferResult> {
        // Every register operation leaves the totals consistent, so a
        // poisoned lock still guards valid data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn stats_mut(result: &mut TransferResult, kind: ItemKind) -> &mut ItemStats {
    match kind {
        ItemKind::File => &mut result.files,
        ItemKind::Folder => &mut result.folders,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::stats::Stage;

    #[test]
    fn test_partition_by_kind() {
        let collector = ResultCollector::new();
        collector.register_success(&Item::file("a.txt"));
        collector.register_success(&Item::folder("docs"));
        collector.register_ignored(&Item::folder("tmp"));
        collector.register_failed(
            &Item::file("b.txt"),
            [FailureCause::new(1, Stage::Read, "denied")],
        );

        let result = collector.finish(Duration::from_secs(2));
        assert_eq!(result.files.success_count, 1);
        assert_eq!(result.folders.success_count, 1);
        assert_eq!(result.folders.ignored_count(), 1);
        assert_eq!(result.files.failed, vec!["b.txt".to_string()]);
        assert_eq!(result.elapsed, Duration::from_secs(2));
        assert!(result.has_failures());
    }

    #[test]
    fn test_concurrent_registration_loses_nothing() {
        let collector = Arc::new(ResultCollector::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for i in 0..250 {
                        let item = Item::file(format!("{t}/{i}"));
                        match i % 3 {
                            0 => collector.register_success(&item),
                            1 => {
                                collector.register_ignored(&item);
                                collector.register_ignored(&item);
                            }
                            _ => collector.register_failed(
                                &item,
                                [FailureCause::new(1, Stage::Store, "full")],
                            ),
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let result = Arc::into_inner(collector).unwrap().finish(Duration::ZERO);
        assert_eq!(result.files.total(), 8 * 250);
        assert_eq!(result.files.success_count, 8 * 84);
        assert_eq!(result.files.ignored_count(), 8 * 83);
        assert_eq!(result.files.failed_count(), 8 * 83);
    }

    #[test]
    fn test_summary() {
        let collector = ResultCollector::new();
        collector.register_success(&Item::file("a"));
        collector.register_ignored(&Item::file("b"));
        let result = collector.finish(Duration::ZERO);
        assert_eq!(result.summary(), "1 stored, 1 ignored, 0 failed");
    }
}
