//! Source and destination capability contracts.
//!
//! Adapters are called from many worker threads at once, so both traits
//! require `Send + Sync` and take `&self`. An adapter that needs mutable
//! state guards it itself.

use backhaul_core::{DiscoveryError, Item, TransferError, paths};

use crate::context::RunContext;

/// Lazily produced sequence of discovered items.
///
/// An `Err` ends the discovery and aborts the run.
pub type ItemIter<'a> = Box<dyn Iterator<Item = Result<Item, DiscoveryError>> + Send + 'a>;

/// Something items can be backed up from.
pub trait Source: Send + Sync {
    /// Sanitized identifier, unique among sources.
    fn id(&self) -> &str;

    /// Root that every item source path starts with.
    fn root_path(&self) -> &str;

    /// Prepare for a run. Called once, before discovery.
    fn initialize(&self, _context: &RunContext) -> Result<(), TransferError> {
        Ok(())
    }

    /// Enumerate every item under the root.
    fn items(&self) -> Result<ItemIter<'_>, DiscoveryError>;

    /// Read the full payload of an item. Folders read as empty.
    fn read_item(&self, item: &Item) -> Result<Vec<u8>, TransferError>;

    /// Path of an item relative to the source root.
    fn relative_path(&self, item: &Item) -> String {
        paths::strip_root(item.source_path(), self.root_path()).to_string()
    }

    /// Release resources. Called once, after every worker is done.
    fn terminate(&self, _context: &RunContext) -> Result<(), TransferError> {
        Ok(())
    }
}

/// Something items can be backed up to.
pub trait Destination: Send + Sync {
    /// Sanitized identifier, unique among destinations.
    fn id(&self) -> &str;

    /// Prepare for a run. Called once, after the source is initialized.
    fn initialize(&self, _context: &RunContext) -> Result<(), TransferError> {
        Ok(())
    }

    /// Persist an item at its assigned destination path.
    ///
    /// Storing the same item again overwrites the earlier copy.
    fn store_item(&self, item: &Item, data: &[u8]) -> Result<(), TransferError>;

    /// Flush and release resources. Called once, after every worker is done.
    fn terminate(&self, _context: &RunContext) -> Result<(), TransferError> {
        Ok(())
    }
}

/// Destination path assigned to an item, or an error if it has none.
pub fn destination_path(item: &Item) -> Result<&str, TransferError> {
    item.destination().ok_or_else(|| TransferError::Unnamed {
        key: item.source_path().to_string(),
    })
}
