//! backhaul - Concurrent, retrying backups from any source to any destination.
//!
//! Usage:
//!   backhaul run             Run the jobs declared in the catalog
//!   backhaul copy ...        Run one ad-hoc backup
//!   backhaul jobs            List the jobs declared in the catalog
//!   backhaul --help          Show help

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use backhaul_adapters::{
    Catalog, CommandDumpSource, LocalFolderDestination, LocalFolderSource, ZipDestination,
    default_catalog_path,
};
use backhaul_core::{
    DEFAULT_MAX_ITEM_RETRIES, DEFAULT_MAX_THREADS, ItemStats, NamingKind, TransferResult,
};
use backhaul_engine::{
    Destination, JobSelector, Source, TracingObserver, TransferJob, strategy_for,
};

#[derive(Parser)]
#[command(
    name = "backhaul",
    version,
    about = "Concurrent, retrying backups from pluggable sources to pluggable destinations",
    long_about = "backhaul copies every item of a source to a destination on a pool of \
                  workers, retrying failed items and reporting what was stored, ignored, \
                  and failed.\n\n\
                  Declare sources, destinations, and jobs in a catalog file and run them \
                  with `backhaul run`, or back up a single folder with `backhaul copy`."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the jobs declared in a catalog
    Run {
        /// Catalog file (defaults to the user config directory)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Only run the job with this name
        #[arg(short, long)]
        job: Option<String>,

        /// Only run jobs whose source id starts with this prefix
        #[arg(long)]
        source_starts_with: Option<String>,

        /// Only run jobs whose source id ends with this suffix
        #[arg(long)]
        source_ends_with: Option<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run one backup without a catalog
    Copy {
        /// Kind of source
        #[arg(long, default_value = "local-folder")]
        source_type: SourceType,

        /// Folder to back up, or the dump command to run
        #[arg(long)]
        source: String,

        /// Arguments of the dump command
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,

        /// Kind of destination
        #[arg(long, default_value = "local-folder")]
        destination_type: DestinationType,

        /// Folder to write the backup into
        #[arg(long)]
        destination: PathBuf,

        /// Ignore items whose source path matches this regular expression
        #[arg(long)]
        ignore: Option<String>,

        /// Number of transfer workers
        #[arg(long, default_value_t = DEFAULT_MAX_THREADS)]
        max_threads: i32,

        /// Attempts per item before it is marked failed
        #[arg(long, default_value_t = DEFAULT_MAX_ITEM_RETRIES)]
        max_item_retries: i32,

        /// Destination naming policy (date, source-id)
        #[arg(long, default_value = "date")]
        naming: NamingKind,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the jobs declared in a catalog
    Jobs {
        /// Catalog file (defaults to the user config directory)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceType {
    LocalFolder,
    CommandDump,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DestinationType {
    LocalFolder,
    Zip,
}

/// The outcome of one job, as reported to the user.
struct JobReport {
    name: String,
    outcome: std::result::Result<TransferResult, String>,
}

impl JobReport {
    fn succeeded(&self) -> bool {
        matches!(&self.outcome, Ok(result) if !result.has_failures())
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            file,
            job,
            source_starts_with,
            source_ends_with,
            format,
        } => {
            let selector = JobSelector {
                name: job,
                source_starts_with,
                source_ends_with,
            };
            run_catalog(file, &selector, format)
        }
        Command::Copy {
            source_type,
            source,
            args,
            destination_type,
            destination,
            ignore,
            max_threads,
            max_item_retries,
            naming,
            format,
        } => {
            let source: Arc<dyn Source> = match source_type {
                SourceType::LocalFolder => Arc::new(LocalFolderSource::from_path(&source)),
                SourceType::CommandDump => {
                    Arc::new(CommandDumpSource::new(&source, source.as_str()).with_args(args))
                }
            };
            let destination: Arc<dyn Destination> = match destination_type {
                DestinationType::LocalFolder => {
                    Arc::new(LocalFolderDestination::from_path(destination))
                }
                DestinationType::Zip => Arc::new(ZipDestination::from_path(destination)),
            };

            let mut job = TransferJob::new("", source, destination)
                .with_naming(strategy_for(naming))
                .with_max_threads(max_threads)
                .with_max_item_retries(max_item_retries);
            if let Some(pattern) = ignore {
                job = job.with_ignore_pattern(&pattern)?;
            }

            let reports = vec![run_job(job)];
            print_reports(&reports, format)?;
            Ok(exit_code(&reports))
        }
        Command::Jobs { file, format } => list_jobs(file, format),
    }
}

/// Initialize logging on stderr. `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(file: Option<PathBuf>) -> Result<Catalog> {
    let path = file.unwrap_or_else(default_catalog_path);
    let catalog = Catalog::load(&path)
        .wrap_err_with(|| format!("Cannot load catalog {}", path.display()))?;

    info!(
        catalog = %path.display(),
        sources = catalog.sources.len(),
        destinations = catalog.destinations.len(),
        jobs = catalog.jobs.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Run the selected catalog jobs one after another.
fn run_catalog(
    file: Option<PathBuf>,
    selector: &JobSelector,
    format: OutputFormat,
) -> Result<ExitCode> {
    let catalog = load_catalog(file)?;
    let jobs = catalog.select(selector).context("Invalid catalog")?;

    if jobs.is_empty() {
        warn!("no job matches the selection");
    }

    let reports: Vec<_> = jobs.into_iter().map(run_job).collect();
    print_reports(&reports, format)?;
    Ok(exit_code(&reports))
}

/// Run a job, turning a fatal error into a failed report.
fn run_job(job: TransferJob) -> JobReport {
    let job = job.with_observer(Arc::new(TracingObserver));
    let outcome = job.run().map_err(|e| {
        error!(job = %job.name(), error = %e, "job failed");
        e.to_string()
    });

    JobReport {
        name: job.name().to_string(),
        outcome,
    }
}

fn exit_code(reports: &[JobReport]) -> ExitCode {
    if reports.iter().all(JobReport::succeeded) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_reports(reports: &[JobReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for report in reports {
                print_report(report);
            }
        }
        OutputFormat::Json => {
            let json: Vec<_> = reports
                .iter()
                .map(|report| match &report.outcome {
                    Ok(result) => serde_json::json!({ "job": report.name, "result": result }),
                    Err(message) => serde_json::json!({ "job": report.name, "error": message }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

fn print_report(report: &JobReport) {
    println!();
    println!("{}", "─".repeat(60));

    let result = match &report.outcome {
        Ok(result) => result,
        Err(message) => {
            println!(" {} - FAILED", report.name);
            println!("{}", "─".repeat(60));
            println!(" {message}");
            return;
        }
    };

    println!(" {} - {}", report.name, format_elapsed(result.elapsed));
    println!("{}", "─".repeat(60));
    print_stats("Files", &result.files);
    print_stats("Folders", &result.folders);

    for stats in [&result.files, &result.folders] {
        for key in &stats.failed {
            println!();
            println!(" Failed {}: {}", stats.kind, key);
            for cause in stats.failed_causes(key).unwrap_or_default() {
                println!("   {cause}");
            }
        }
    }
}

fn print_stats(label: &str, stats: &ItemStats) {
    println!(
        " {:<8} {} stored, {} ignored, {} failed",
        format!("{label}:"),
        stats.success_count,
        stats.ignored_count(),
        stats.failed_count()
    );
}

/// Format a duration as `hh:mm:ss`.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// List catalog jobs.
fn list_jobs(file: Option<PathBuf>, format: OutputFormat) -> Result<ExitCode> {
    let catalog = load_catalog(file)?;

    match format {
        OutputFormat::Text => {
            println!("{}", "─".repeat(60));
            for job in &catalog.jobs {
                let ignore = job
                    .ignore_pattern
                    .as_deref()
                    .map(|pattern| format!(", ignore {pattern}"))
                    .unwrap_or_default();
                println!(
                    " {:<24} {} -> {} ({}, {} threads, {} attempts{})",
                    job.display_name(),
                    job.source,
                    job.destination,
                    job.naming,
                    job.threads(),
                    job.attempts(),
                    ignore
                );
            }
            println!("{}", "─".repeat(60));
            println!(" {} job(s)", catalog.jobs.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&catalog.jobs)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
