//! Zip archive destination.

use std::collections::HashSet;
use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use backhaul_core::{Item, TransferError, paths, sanitize_id};
use backhaul_engine::{Destination, RunContext, destination_path};
use tempfile::NamedTempFile;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::local::{default_id, logical_to_local};

/// Writes every run into one zip archive, `<folder>/<naming root>.zip`.
///
/// Entries are named by their path below the naming root. The archive is
/// built in a temporary file next to its final location and only appears
/// there once the run terminates.
pub struct ZipDestination {
    id: String,
    folder: PathBuf,
    archive: Mutex<Option<OpenArchive>>,
}

struct OpenArchive {
    writer: ZipWriter<NamedTempFile>,
    path: PathBuf,
    naming_root: String,
    entries: HashSet<String>,
}

impl ZipDestination {
    /// Create a destination writing archives into `folder`. The id is sanitized.
    pub fn new(id: impl AsRef<str>, folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        Self {
            id: sanitize_id(id.as_ref()),
            folder: std::path::absolute(&folder).unwrap_or(folder),
            archive: Mutex::new(None),
        }
    }

    /// Create a destination named after the last component of `folder`.
    pub fn from_path(folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        let id = default_id(&folder);
        Self::new(id, folder)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Archive path for a naming root.
    pub fn archive_path(&self, naming_root: &str) -> Result<PathBuf, TransferError> {
        let mut path = logical_to_local(&self.folder, naming_root)?;
        path.as_mut_os_string().push(".zip");
        Ok(path)
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenArchive>> {
        self.archive.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn not_initialized(&self) -> TransferError {
        TransferError::NotInitialized {
            step: self.id.clone(),
        }
    }
}

impl std::fmt::Debug for ZipDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipDestination")
            .field("id", &self.id)
            .field("folder", &self.folder)
            .field("open", &self.archive.try_lock().map(|a| a.is_some()).ok())
            .finish()
    }
}

impl Destination for ZipDestination {
    fn id(&self) -> &str {
        &self.id
    }

    fn initialize(&self, context: &RunContext) -> Result<(), TransferError> {
        let path = self.archive_path(context.naming_root())?;
        let parent = path.parent().unwrap_or(&self.folder).to_path_buf();
        fs::create_dir_all(&parent).map_err(|e| TransferError::io(&parent, e))?;

        let file = tempfile::Builder::new()
            .prefix(".backhaul-")
            .suffix(".zip.tmp")
            .tempfile_in(&parent)
            .map_err(|e| TransferError::io(&parent, e))?;

        tracing::debug!(destination = %self.id, archive = %path.display(), "opening archive");

        *self.lock() = Some(OpenArchive {
            writer: ZipWriter::new(file),
            path,
            naming_root: context.naming_root().to_string(),
            entries: HashSet::new(),
        });
        Ok(())
    }

    fn store_item(&self, item: &Item, data: &[u8]) -> Result<(), TransferError> {
        let destination = destination_path(item)?;
        let mut guard = self.lock();
        let archive = guard.as_mut().ok_or_else(|| self.not_initialized())?;

        let mut name = paths::strip_root(destination, &archive.naming_root)
            .trim_start_matches(paths::SEPARATOR)
            .to_string();
        if item.is_folder() {
            name.push(paths::SEPARATOR);
        }

        // Entries cannot be replaced once written
        if !archive.entries.insert(name.clone()) {
            tracing::debug!(entry = %name, "entry already in archive");
            return Ok(());
        }

        let options = entry_options(data.len());
        let written = if item.is_folder() {
            archive.writer.add_directory(name.as_str(), options)
        } else {
            write_entry(&mut archive.writer, &name, data, options)
        };

        written.map_err(|e| {
            archive.entries.remove(&name);
            TransferError::Archive {
                message: format!("{name}: {e}"),
            }
        })
    }

    fn terminate(&self, _context: &RunContext) -> Result<(), TransferError> {
        let Some(archive) = self.lock().take() else {
            return Ok(());
        };

        let file = archive.writer.finish().map_err(|e| TransferError::Archive {
            message: e.to_string(),
        })?;
        file.persist(&archive.path)
            .map_err(|e| TransferError::io(&archive.path, e.error))?;

        tracing::info!(
            destination = %self.id,
            archive = %archive.path.display(),
            entries = archive.entries.len(),
            "archive written"
        );
        Ok(())
    }
}

/// Entries of 4 GiB or more need zip64 headers.
fn needs_large_file(len: u64) -> bool {
    len >= u64::from(u32::MAX)
}

fn entry_options(len: usize) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(needs_large_file(len as u64))
}

/// Write one file entry. A failed write is aborted so the name can be retried.
fn write_entry<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    name: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> ZipResult<()> {
    writer.start_file(name, options)?;
    if let Err(e) = writer.write_all(data) {
        if let Err(abort) = writer.abort_file() {
            tracing::warn!(entry = %name, error = %abort, "failed to abort entry");
        }
        return Err(e.into());
    }
    Ok(())
}
