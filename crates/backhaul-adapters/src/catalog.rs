//! TOML job catalog.
//!
//! ```toml
//! [[source]]
//! type = "local-folder"
//! id = "docs"
//! path = "/home/me/Documents"
//!
//! [[source]]
//! type = "command-dump"
//! id = "shop-db"
//! command = "mysqldump"
//! args = ["--single-transaction", "shop"]
//!
//! [[destination]]
//! type = "zip"
//! id = "nas"
//! path = "/mnt/nas/backups"
//!
//! [[job]]
//! source = "docs"
//! destination = "nas"
//! ignore_pattern = '\.tmp$'
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use backhaul_core::{ConfigError, JobConfig};
use backhaul_engine::{Destination, JobSelector, Source, StepRegistry, TransferJob};
use serde::{Deserialize, Serialize};

use crate::command::{CommandDumpSource, DEFAULT_DUMP_FILE_NAME};
use crate::local::{LocalFolderDestination, LocalFolderSource};
use crate::zip_archive::ZipDestination;

/// A declared source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceConfig {
    /// A local folder. The id defaults to the folder name.
    LocalFolder {
        #[serde(default)]
        id: Option<String>,
        path: PathBuf,
    },
    /// The standard output of a dump command.
    CommandDump {
        id: String,
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_dump_file_name")]
        file_name: String,
    },
}

fn default_dump_file_name() -> String {
    DEFAULT_DUMP_FILE_NAME.to_string()
}

impl SourceConfig {
    /// Build the source this entry describes.
    pub fn build(&self) -> Arc<dyn Source> {
        match self {
            Self::LocalFolder { id: Some(id), path } => Arc::new(LocalFolderSource::new(id, path)),
            Self::LocalFolder { id: None, path } => Arc::new(LocalFolderSource::from_path(path)),
            Self::CommandDump {
                id,
                command,
                args,
                file_name,
            } => Arc::new(
                CommandDumpSource::new(id, command.as_str())
                    .with_args(args.iter().cloned())
                    .with_file_name(file_name),
            ),
        }
    }
}

/// A declared destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DestinationConfig {
    /// A local folder. The id defaults to the folder name.
    LocalFolder {
        #[serde(default)]
        id: Option<String>,
        path: PathBuf,
    },
    /// One zip archive per run, written into a folder.
    Zip {
        #[serde(default)]
        id: Option<String>,
        path: PathBuf,
    },
}

impl DestinationConfig {
    /// Build the destination this entry describes.
    pub fn build(&self) -> Arc<dyn Destination> {
        match self {
            Self::LocalFolder { id: Some(id), path } => {
                Arc::new(LocalFolderDestination::new(id, path))
            }
            Self::LocalFolder { id: None, path } => {
                Arc::new(LocalFolderDestination::from_path(path))
            }
            Self::Zip { id: Some(id), path } => Arc::new(ZipDestination::new(id, path)),
            Self::Zip { id: None, path } => Arc::new(ZipDestination::from_path(path)),
        }
    }
}

/// Sources, destinations, and the jobs that connect them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,

    #[serde(default, rename = "destination")]
    pub destinations: Vec<DestinationConfig>,

    #[serde(default, rename = "job")]
    pub jobs: Vec<JobConfig>,
}

impl Catalog {
    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse catalog text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    /// Build every declared source and destination.
    pub fn registry(&self) -> Result<StepRegistry, ConfigError> {
        let mut registry = StepRegistry::new();
        for source in &self.sources {
            registry.register_source(source.build())?;
        }
        for destination in &self.destinations {
            registry.register_destination(destination.build())?;
        }
        Ok(registry)
    }

    /// Resolve the jobs a selector picks.
    ///
    /// Steps are built once and shared by every job that references them.
    pub fn select(&self, selector: &JobSelector) -> Result<Vec<TransferJob>, ConfigError> {
        let registry = self.registry()?;
        registry.resolve_all(self.jobs.iter().filter(|job| selector.matches_config(job)))
    }

    /// Resolve every job.
    pub fn transfer_jobs(&self) -> Result<Vec<TransferJob>, ConfigError> {
        self.select(&JobSelector::all())
    }
}

/// Default catalog location, `<config dir>/backhaul/jobs.toml`.
pub fn default_catalog_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("backhaul")
        .join("jobs.toml")
}
