//! Backup item descriptors.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Kind of a discovered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemKind {
    /// A regular file with a byte payload.
    File,
    /// A folder, stored with an empty payload.
    Folder,
}

/// One unit discovered on a source.
///
/// The source path is the identity key of the item and never changes once
/// the item is created. The destination path is assigned by the naming
/// strategy the first time the item is about to be stored, and stays the
/// same for every later retry.
#[derive(Debug)]
pub struct Item {
    kind: ItemKind,
    source_path: String,
    destination: OnceLock<String>,
}

impl Item {
    /// Create a new item.
    pub fn new(source_path: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            kind,
            source_path: source_path.into(),
            destination: OnceLock::new(),
        }
    }

    /// Create a file item.
    pub fn file(source_path: impl Into<String>) -> Self {
        Self::new(source_path, ItemKind::File)
    }

    /// Create a folder item.
    pub fn folder(source_path: impl Into<String>) -> Self {
        Self::new(source_path, ItemKind::Folder)
    }

    /// The kind of this item.
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Check if this item is a file.
    pub fn is_file(&self) -> bool {
        self.kind == ItemKind::File
    }

    /// Check if this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }

    /// Full path of the item on its source. Used as the item key.
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Destination path, if one was assigned already.
    pub fn destination(&self) -> Option<&str> {
        self.destination.get().map(String::as_str)
    }

    /// Assign the destination path, computing it only if none is set yet.
    ///
    /// Returns the path the item ends up with.
    pub fn assign_destination(&self, compute: impl FnOnce() -> String) -> &str {
        self.destination.get_or_init(compute)
    }
}

impl Clone for Item {
    fn clone(&self) -> Self {
        let destination = OnceLock::new();
        if let Some(path) = self.destination.get() {
            let _ = destination.set(path.clone());
        }

        Self {
            kind: self.kind,
            source_path: self.source_path.clone(),
            destination,
        }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.source_path == other.source_path
    }
}

impl Eq for Item {}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.source_path, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_assigned_once() {
        let item = Item::file("/src/a.txt");
        assert!(item.destination().is_none());

        assert_eq!(item.assign_destination(|| "root/a.txt".to_string()), "root/a.txt");
        assert_eq!(item.assign_destination(|| "other/a.txt".to_string()), "root/a.txt");
        assert_eq!(item.destination(), Some("root/a.txt"));
    }

    #[test]
    fn test_clone_keeps_destination() {
        let item = Item::folder("/src/docs");
        item.assign_destination(|| "root/docs".to_string());

        let copy = item.clone();
        assert_eq!(copy, item);
        assert_eq!(copy.destination(), Some("root/docs"));
        assert!(copy.is_folder());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ItemKind::File.to_string(), "file");
        assert_eq!(ItemKind::Folder.to_string(), "folder");
    }
}
