//! Database dumps produced by an external command.

use std::process::Command;

use backhaul_core::{DiscoveryError, Item, TransferError, paths, sanitize_id};
use backhaul_engine::{ItemIter, Source};

/// File name of the dump when none is configured.
pub const DEFAULT_DUMP_FILE_NAME: &str = "database.backup.sql";

/// Backs up the standard output of a dump command as a single file.
///
/// Typical commands are `mysqldump`, `pg_dump`, or `sqlcmd`. The command is
/// run once per read, so a retried item runs a fresh dump.
#[derive(Debug, Clone)]
pub struct CommandDumpSource {
    id: String,
    command: String,
    args: Vec<String>,
    item_path: String,
}

impl CommandDumpSource {
    /// Create a source running `command` with no arguments. The id is sanitized.
    pub fn new(id: impl AsRef<str>, command: impl Into<String>) -> Self {
        Self {
            id: sanitize_id(id.as_ref()),
            command: command.into(),
            args: Vec::new(),
            item_path: paths::combine("/", DEFAULT_DUMP_FILE_NAME),
        }
    }

    /// Set the command arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the file name the dump is stored under.
    pub fn with_file_name(mut self, file_name: &str) -> Self {
        self.item_path = paths::combine("/", file_name);
        self
    }

    /// Source path of the single dump item.
    pub fn item_path(&self) -> &str {
        &self.item_path
    }

    fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Source for CommandDumpSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn root_path(&self) -> &str {
        "/"
    }

    fn items(&self) -> Result<ItemIter<'_>, DiscoveryError> {
        Ok(Box::new(std::iter::once(Ok(Item::file(self.item_path.clone())))))
    }

    fn read_item(&self, item: &Item) -> Result<Vec<u8>, TransferError> {
        if item.source_path() != self.item_path {
            return Err(TransferError::other(format!(
                "{} has no item {}",
                self.id,
                item.source_path()
            )));
        }

        tracing::debug!(source = %self.id, command = %self.command, "running dump command");

        let output = Command::new(&self.command)
            .args(&self.args)
            .output()
            .map_err(|e| TransferError::Command {
                command: self.command_line(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransferError::Command {
                command: self.command_line(),
                message: format!("{} {}", output.status, stderr.trim()),
            });
        }

        Ok(output.stdout)
    }
}
