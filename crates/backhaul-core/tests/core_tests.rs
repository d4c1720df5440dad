use backhaul_core::{
    FailureCause, Item, ItemKind, JobConfig, LookupError, NamingKind, ResultCollector, Stage,
    TransferResult, paths,
};
use std::time::Duration;

#[test]
fn test_item_identity() {
    let a = Item::file("/src/a.txt");
    let b = Item::file("/src/a.txt");
    let folder = Item::folder("/src/a.txt");

    assert_eq!(a, b);
    assert_ne!(a, folder);
    assert_eq!(a.kind(), ItemKind::File);
    assert_eq!(a.to_string(), "/src/a.txt (file)");
}

#[test]
fn test_every_item_lands_in_one_bucket() {
    let collector = ResultCollector::new();
    let items = [
        Item::folder("A"),
        Item::file("A/x.txt"),
        Item::folder("B"),
        Item::file("B/y.txt"),
        Item::file("C/z.txt"),
    ];

    collector.register_success(&items[0]);
    collector.register_success(&items[1]);
    assert!(collector.register_ignored(&items[2]));
    assert!(collector.register_ignored(&items[3]));
    assert!(!collector.register_ignored(&items[3]));
    collector.register_failed(
        &items[4],
        (1..=3).map(|attempt| FailureCause::new(attempt, Stage::Read, "denied")),
    );

    let result = collector.finish(Duration::from_millis(5));
    assert_eq!(result.folders.total(), 2);
    assert_eq!(result.files.total(), 3);
    assert_eq!(result.files.failed_causes("C/z.txt").unwrap().len(), 3);
    assert!(matches!(
        result.files.failed_causes("A/x.txt"),
        Err(LookupError::NotFound { .. })
    ));
}

#[test]
fn test_result_serializes_every_bucket() {
    let collector = ResultCollector::new();
    collector.register_success(&Item::file("a"));
    collector.register_ignored(&Item::folder("tmp"));
    collector.register_failed(&Item::file("b"), [FailureCause::new(1, Stage::Store, "full")]);
    let result = collector.finish(Duration::from_secs(1));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["files"]["success_count"], 1);
    assert_eq!(json["folders"]["ignored"][0], "tmp");
    assert_eq!(json["files"]["failed"][0], "b");
    assert_eq!(json["files"]["failed_causes"]["b"][0]["stage"], "store");

    let back: TransferResult = serde_json::from_value(json).unwrap();
    assert_eq!(back.files.failed_count(), 1);
}

#[test]
fn test_job_config_defaults_from_file() {
    let config: JobConfig =
        serde_json::from_str(r#"{ "source": "docs", "destination": "zip" }"#).unwrap();

    assert_eq!(config.max_item_retries, 100);
    assert_eq!(config.max_threads, 20);
    assert_eq!(config.naming, NamingKind::Date);
    assert!(config.ignore_pattern.is_none());
    assert_eq!(config.display_name(), "docs2zip");
}

#[test]
fn test_job_config_naming_is_kebab_case() {
    let config: JobConfig = serde_json::from_str(
        r#"{ "source": "docs", "destination": "zip", "naming": "source-id", "max_threads": 0 }"#,
    )
    .unwrap();

    assert_eq!(config.naming, NamingKind::SourceId);
    assert_eq!(config.threads(), 20);
}

#[test]
fn test_combine_is_deterministic() {
    let first = paths::combine("docs/20240102-0304", "/a/b.txt");
    let second = paths::combine("docs/20240102-0304", "/a/b.txt");
    assert_eq!(first, second);
    assert_eq!(first, "docs/20240102-0304/a/b.txt");
}
