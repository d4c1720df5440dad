//! Local folder source and destination.

use std::fs;
use std::path::{Path, PathBuf};

use backhaul_core::{DiscoveryError, Item, ItemKind, TransferError, paths, sanitize_id};
use backhaul_engine::{Destination, ItemIter, RunContext, Source, destination_path};
use jwalk::{Parallelism, WalkDir};

/// Backs up every file and folder below a local folder.
#[derive(Debug, Clone)]
pub struct LocalFolderSource {
    id: String,
    root: PathBuf,
    root_path: String,
}

impl LocalFolderSource {
    /// Create a source for `path`. The id is sanitized.
    pub fn new(id: impl AsRef<str>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let root = std::path::absolute(&path).unwrap_or(path);
        let root_path = root.to_string_lossy().into_owned();

        Self {
            id: sanitize_id(id.as_ref()),
            root,
            root_path,
        }
    }

    /// Create a source named after the last component of `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = default_id(&path);
        Self::new(id, path)
    }

    /// The absolute folder being backed up.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Source for LocalFolderSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn root_path(&self) -> &str {
        &self.root_path
    }

    fn items(&self) -> Result<ItemIter<'_>, DiscoveryError> {
        let metadata = fs::metadata(&self.root).map_err(|e| DiscoveryError::io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(DiscoveryError::NotADirectory {
                path: self.root.clone(),
            });
        }

        let walker = WalkDir::new(&self.root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1);

        let root = self.root.clone();
        let items = walker.into_iter().filter_map(move |entry| match entry {
            Ok(entry) => {
                let path = entry.path();
                let kind = item_kind(&path, entry.file_type())?;
                Some(Ok(Item::new(path.to_string_lossy().into_owned(), kind)))
            }
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                let message = err.to_string();
                Some(Err(match err.into_io_error() {
                    Some(source) => DiscoveryError::io(path, source),
                    None => DiscoveryError::other(message),
                }))
            }
        });

        Ok(Box::new(items))
    }

    fn read_item(&self, item: &Item) -> Result<Vec<u8>, TransferError> {
        if item.is_folder() {
            return Ok(Vec::new());
        }
        let path = Path::new(item.source_path());
        fs::read(path).map_err(|e| TransferError::io(path, e))
    }
}

/// Kind of a walked entry. Symlinks take the kind of their target and are not
/// descended into; a link whose target is missing yields `None`.
fn item_kind(path: &Path, file_type: fs::FileType) -> Option<ItemKind> {
    if !file_type.is_symlink() {
        return Some(if file_type.is_dir() {
            ItemKind::Folder
        } else {
            ItemKind::File
        });
    }

    match fs::metadata(path) {
        Ok(target) if target.is_dir() => Some(ItemKind::Folder),
        Ok(_) => Some(ItemKind::File),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unresolvable symlink");
            None
        }
    }
}

/// Writes items below a local folder, mirroring their destination paths.
#[derive(Debug, Clone)]
pub struct LocalFolderDestination {
    id: String,
    root: PathBuf,
}

impl LocalFolderDestination {
    /// Create a destination writing below `path`. The id is sanitized.
    pub fn new(id: impl AsRef<str>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: sanitize_id(id.as_ref()),
            root: std::path::absolute(&path).unwrap_or(path),
        }
    }

    /// Create a destination named after the last component of `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = default_id(&path);
        Self::new(id, path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path an item's destination path maps to.
    pub fn local_path(&self, destination: &str) -> Result<PathBuf, TransferError> {
        logical_to_local(&self.root, destination)
    }
}

impl Destination for LocalFolderDestination {
    fn id(&self) -> &str {
        &self.id
    }

    fn initialize(&self, _context: &RunContext) -> Result<(), TransferError> {
        fs::create_dir_all(&self.root).map_err(|e| TransferError::io(&self.root, e))
    }

    fn store_item(&self, item: &Item, data: &[u8]) -> Result<(), TransferError> {
        let target = self.local_path(destination_path(item)?)?;

        if item.is_folder() {
            return fs::create_dir_all(&target).map_err(|e| TransferError::io(&target, e));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
        }
        fs::write(&target, data).map_err(|e| TransferError::io(&target, e))
    }
}

/// Map a logical `/`-separated path below `root`.
///
/// Empty and `.` segments are skipped; `..` segments are rejected.
pub(crate) fn logical_to_local(root: &Path, logical: &str) -> Result<PathBuf, TransferError> {
    let mut path = root.to_path_buf();
    for segment in logical.split(paths::SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(TransferError::other(format!(
                    "Destination path escapes its root: {logical}"
                )));
            }
            segment => path.push(segment),
        }
    }
    Ok(path)
}

pub(crate) fn default_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
