//! Integration tests for the built-in adapters on a real filesystem.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use backhaul_adapters::{
    Catalog, CommandDumpSource, LocalFolderDestination, LocalFolderSource, ZipDestination,
};
use backhaul_core::{ConfigError, Stage};
use backhaul_engine::{JobSelector, SourceIdNaming, TransferJob};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn create_test_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join("A")).unwrap();
    fs::create_dir_all(root.join("B/deep")).unwrap();
    fs::write(root.join("A/x.txt"), "hello").unwrap();
    fs::write(root.join("B/y.txt"), "world").unwrap();
    fs::write(root.join("B/deep/z.tmp"), "scratch").unwrap();
    fs::write(root.join(".hidden"), "secret").unwrap();

    temp
}

#[test]
fn test_local_source_discovers_sorted_tree() {
    let tree = create_test_tree();
    let source = LocalFolderSource::new("docs", tree.path());

    let items: Vec<_> = backhaul_engine::Source::items(&source)
        .unwrap()
        .map(|item| item.unwrap())
        .collect();

    let relative: Vec<_> = items
        .iter()
        .map(|item| backhaul_engine::Source::relative_path(&source, item))
        .collect();
    let relative: Vec<_> = relative.iter().map(|p| p.replace('\\', "/")).collect();

    assert_eq!(
        relative,
        vec!["/.hidden", "/A", "/A/x.txt", "/B", "/B/deep", "/B/deep/z.tmp", "/B/y.txt"]
    );
    assert!(items[1].is_folder());
    assert!(items[2].is_file());
}

#[test]
fn test_local_to_local_backup() {
    let tree = create_test_tree();
    let target = TempDir::new().unwrap();

    let destination = Arc::new(LocalFolderDestination::new("mirror", target.path()));
    let job = TransferJob::new(
        "",
        Arc::new(LocalFolderSource::new("docs", tree.path())),
        destination,
    )
    .with_ignore_pattern(r"\.tmp$")
    .unwrap();

    let started_at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let result = job.run_at(started_at).unwrap();

    assert_eq!(result.files.success_count, 3);
    assert_eq!(result.folders.success_count, 3);
    assert_eq!(result.files.ignored_count(), 1);
    assert!(!result.has_failures());

    let run_root = target.path().join("docs").join("20240501-0800");
    assert_eq!(fs::read_to_string(run_root.join("A/x.txt")).unwrap(), "hello");
    assert_eq!(fs::read_to_string(run_root.join("B/y.txt")).unwrap(), "world");
    assert!(run_root.join("B/deep").is_dir());
    assert!(!run_root.join("B/deep/z.tmp").exists());
}

#[cfg(unix)]
#[test]
fn test_symlinks_take_the_kind_of_their_target() {
    use std::os::unix::fs::symlink;

    let tree = create_test_tree();
    let target = TempDir::new().unwrap();
    symlink(tree.path().join("A"), tree.path().join("link")).unwrap();
    symlink(tree.path().join("A/x.txt"), tree.path().join("filelink")).unwrap();
    symlink(tree.path().join("nowhere"), tree.path().join("dangling")).unwrap();

    let job = TransferJob::new(
        "",
        Arc::new(LocalFolderSource::new("docs", tree.path())),
        Arc::new(LocalFolderDestination::new("mirror", target.path())),
    )
    .with_naming(Arc::new(SourceIdNaming));

    let result = job.run().unwrap();
    assert!(!result.has_failures());
    assert_eq!(result.folders.success_count, 4);
    assert_eq!(result.files.success_count, 5);

    let run_root = target.path().join("docs");
    assert!(run_root.join("link").is_dir());
    assert_eq!(fs::read_to_string(run_root.join("filelink")).unwrap(), "hello");
    assert!(!run_root.join("dangling").exists());
}

#[test]
fn test_local_source_missing_root_aborts() {
    let target = TempDir::new().unwrap();
    let job = TransferJob::new(
        "",
        Arc::new(LocalFolderSource::new("gone", target.path().join("missing"))),
        Arc::new(LocalFolderDestination::new("mirror", target.path())),
    );
    assert!(job.run().is_err());
}

fn read_entry(archive: &Path, name: &str) -> String {
    let file = fs::File::open(archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn test_local_to_zip_backup() {
    let tree = create_test_tree();
    let target = TempDir::new().unwrap();

    let job = TransferJob::new(
        "",
        Arc::new(LocalFolderSource::new("docs", tree.path())),
        Arc::new(ZipDestination::new("zips", target.path())),
    )
    .with_naming(Arc::new(SourceIdNaming))
    .with_max_threads(4);

    let result = job.run().unwrap();
    assert_eq!(result.files.success_count, 4);
    assert_eq!(result.folders.success_count, 3);

    let archive = target.path().join("docs.zip");
    assert!(archive.is_file());
    assert_eq!(read_entry(&archive, "A/x.txt"), "hello");
    assert_eq!(read_entry(&archive, "B/deep/z.tmp"), "scratch");

    let names: Vec<_> = zip::ZipArchive::new(fs::File::open(&archive).unwrap())
        .unwrap()
        .file_names()
        .map(str::to_string)
        .collect();
    assert!(names.contains(&"B/deep/".to_string()));

    // No temporary archive is left behind
    let leftovers: Vec<_> = fs::read_dir(target.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[cfg(unix)]
#[test]
fn test_command_dump_backup() {
    let target = TempDir::new().unwrap();
    let source = CommandDumpSource::new("shop db", "sh")
        .with_args(["-c", "printf 'CREATE TABLE t;'"]);

    let job = TransferJob::new(
        "",
        Arc::new(source),
        Arc::new(LocalFolderDestination::new("mirror", target.path())),
    )
    .with_naming(Arc::new(SourceIdNaming));

    let result = job.run().unwrap();
    assert_eq!(result.files.success_count, 1);
    assert_eq!(
        fs::read_to_string(target.path().join("shop_db/database.backup.sql")).unwrap(),
        "CREATE TABLE t;"
    );
}

#[cfg(unix)]
#[test]
fn test_failing_command_records_stderr() {
    let target = TempDir::new().unwrap();
    let source = CommandDumpSource::new("db", "sh").with_args(["-c", "echo denied >&2; exit 3"]);

    let job = TransferJob::new(
        "",
        Arc::new(source),
        Arc::new(LocalFolderDestination::new("mirror", target.path())),
    )
    .with_max_item_retries(2);

    let result = job.run().unwrap();
    let causes = result.files.failed_causes("/database.backup.sql").unwrap();
    assert_eq!(causes.len(), 2);
    assert_eq!(causes[0].stage, Stage::Read);
    assert!(causes[0].message.contains("denied"));
}

#[test]
fn test_catalog_from_file() {
    let tree = create_test_tree();
    let target = TempDir::new().unwrap();
    let catalog_path = target.path().join("jobs.toml");

    fs::write(
        &catalog_path,
        format!(
            r#"
[[source]]
type = "local-folder"
id = "docs"
path = '{}'

[[destination]]
type = "local-folder"
id = "mirror"
path = '{}'

[[job]]
name = "nightly"
source = "Docs"
destination = "MIRROR"
naming = "source-id"
"#,
            tree.path().display(),
            target.path().join("out").display()
        ),
    )
    .unwrap();

    let catalog = Catalog::load(&catalog_path).unwrap();
    let jobs = catalog
        .select(&JobSelector::all().with_name("NIGHTLY"))
        .unwrap();
    assert_eq!(jobs.len(), 1);

    let result = jobs[0].run().unwrap();
    assert_eq!(result.files.success_count, 4);
    assert!(target.path().join("out/docs/A/x.txt").is_file());
}

#[test]
fn test_catalog_unknown_references() {
    let catalog = Catalog::parse(
        r#"
[[destination]]
type = "zip"
id = "nas"
path = "/mnt/nas"

[[job]]
source = "missing"
destination = "nas"
"#,
    )
    .unwrap();

    let err = catalog.transfer_jobs().unwrap_err();
    assert!(matches!(err, ConfigError::UnknownSource { ref id } if id == "missing"));
}

#[test]
fn test_catalog_duplicate_ids() {
    let catalog = Catalog::parse(
        r#"
[[destination]]
type = "zip"
id = "nas"
path = "/mnt/a"

[[destination]]
type = "local-folder"
id = "NAS"
path = "/mnt/b"
"#,
    )
    .unwrap();

    assert!(matches!(
        catalog.registry(),
        Err(ConfigError::DuplicateId { role: "destination", .. })
    ));
}

#[test]
fn test_catalog_missing_file() {
    let err = Catalog::load(Path::new("/definitely/not/here/jobs.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
