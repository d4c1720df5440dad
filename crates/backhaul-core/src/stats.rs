//! Per-kind transfer statistics.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{LookupError, TransferError};
use crate::item::ItemKind;

/// Step of a transfer attempt that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Reading the payload from the source.
    Read,
    /// Storing the payload on the destination.
    Store,
}

/// The recorded cause of one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Which step failed.
    pub stage: Stage,
    /// Human-readable error message.
    pub message: String,
}

impl FailureCause {
    /// Create a new failure cause.
    pub fn new(attempt: u32, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            attempt,
            stage,
            message: message.into(),
        }
    }

    /// Record a transfer error as the cause of an attempt.
    pub fn from_error(attempt: u32, stage: Stage, error: &TransferError) -> Self {
        Self::new(attempt, stage, error.to_string())
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attempt {} ({}): {}", self.attempt, self.stage, self.message)
    }
}

/// Outcome statistics for every item of one kind.
///
/// Each item key lands in exactly one bucket: successful, ignored, or failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemStats {
    /// Kind of the items counted here.
    pub kind: ItemKind,
    /// Number of items stored successfully.
    pub success_count: u64,
    /// Ignored item keys, unique, in registration order.
    pub ignored: IndexSet<String>,
    /// Failed item keys, unique, in registration order.
    pub failed: Vec<String>,
    /// Every recorded cause per failed key, in attempt order.
    pub failed_causes: IndexMap<String, Vec<FailureCause>>,
}

impl ItemStats {
    /// Create empty stats for a kind.
    pub fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            success_count: 0,
            ignored: IndexSet::new(),
            failed: Vec::new(),
            failed_causes: IndexMap::new(),
        }
    }

    /// Count a successful item.
    pub fn register_success(&mut self) {
        self.success_count += 1;
    }

    /// Register an ignored key. Returns `false` if it was already registered.
    pub fn register_ignored(&mut self, key: &str) -> bool {
        if self.ignored.contains(key) {
            return false;
        }
        self.ignored.insert(key.to_string())
    }

    /// Append failure causes for a key, registering the key on first failure.
    pub fn register_failed(&mut self, key: &str, causes: impl IntoIterator<Item = FailureCause>) {
        if !self.failed_causes.contains_key(key) {
            self.failed.push(key.to_string());
        }
        self.failed_causes
            .entry(key.to_string())
            .or_default()
            .extend(causes);
    }

    /// Every cause recorded for a failed key.
    pub fn failed_causes(&self, key: &str) -> Result<&[FailureCause], LookupError> {
        self.failed_causes
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| LookupError::NotFound {
                key: key.to_string(),
            })
    }

    /// Number of ignored items.
    pub fn ignored_count(&self) -> usize {
        self.ignored.len()
    }

    /// Number of failed items.
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Total number of distinct items accounted for.
    pub fn total(&self) -> u64 {
        self.success_count + self.ignored.len() as u64 + self.failed.len() as u64
    }

    /// Check if any item of this kind failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
