//! Built-in backup adapters for backhaul.
//!
//! - [`LocalFolderSource`] / [`LocalFolderDestination`]: plain folders
//! - [`CommandDumpSource`]: the output of a dump command, such as `mysqldump`
//! - [`ZipDestination`]: one zip archive per run
//!
//! A [`Catalog`] declares sources, destinations, and jobs in a TOML file
//! and builds the matching [`StepRegistry`](backhaul_engine::StepRegistry).

mod catalog;
mod command;
mod local;
mod zip_archive;

pub use catalog::{Catalog, DestinationConfig, SourceConfig, default_catalog_path};
pub use command::{CommandDumpSource, DEFAULT_DUMP_FILE_NAME};
pub use local::{LocalFolderDestination, LocalFolderSource};
pub use zip_archive::ZipDestination;
