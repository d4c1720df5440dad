//! Error types for backup runs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while a source enumerates its items.
///
/// These are fatal: a run that cannot discover its items is aborted and
/// the error is handed back to the caller unchanged.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Permission denied while listing a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl DiscoveryError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an error from a plain message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Errors raised by an adapter while reading, storing, or managing its lifecycle.
///
/// During a transfer these are recoverable: the item is retried until its
/// retry budget runs out.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The item reached the destination without a destination path.
    #[error("No destination path assigned to {key}")]
    Unnamed { key: String },

    /// The adapter was used before `initialize` or after `terminate`.
    #[error("{step} is not initialized")]
    NotInitialized { step: String },

    /// Archive writer failure.
    #[error("Archive error: {message}")]
    Archive { message: String },

    /// External command failure.
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// The adapter panicked while handling the item.
    #[error("Adapter panicked: {message}")]
    Panicked { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl TransferError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an error from a plain message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Errors in job configuration, surfaced before any run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A job references a source that was never declared.
    #[error("Cannot find a source with id '{id}'")]
    UnknownSource { id: String },

    /// A job references a destination that was never declared.
    #[error("Cannot find a destination with id '{id}'")]
    UnknownDestination { id: String },

    /// Two steps of the same role share an id.
    #[error("Duplicate {role} id '{id}'")]
    DuplicateId { role: &'static str, id: String },

    /// The ignore pattern is not a valid regular expression.
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The configuration file could not be read.
    #[error("Cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("Cannot parse configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Failure causes were asked for an item that never failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No failure was registered for the key.
    #[error("There are no failures registered for item '{key}'")]
    NotFound { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_error_io() {
        let err = DiscoveryError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, DiscoveryError::PermissionDenied { .. }));

        let err = DiscoveryError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(matches!(err, DiscoveryError::Io { .. }));
    }

    #[test]
    fn test_lookup_error_message() {
        let err = LookupError::NotFound {
            key: "a.txt".to_string(),
        };
        assert!(err.to_string().contains("a.txt"));
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::UnknownSource {
            id: "docs".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot find a source with id 'docs'");
    }
}
