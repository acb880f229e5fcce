use std::time::Duration;

use notify::event::{AccessKind, CreateKind, MetadataKind, ModifyKind, RemoveKind};
use notify::EventKind;
use sitewatch::config::default_config_path;
use sitewatch::types::{parse_duration, ChangeKind};
use sitewatch::watch::path_utils::{normalize_rel, relative_str};
use sitewatch::watch::watcher::change_kind;

#[test]
fn durations_parse_with_units() {
    assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
    assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("").is_err());
    assert!(parse_duration("5d").is_err());
}

#[test]
fn oversized_durations_are_rejected() {
    let err = parse_duration("9999999999999999h").unwrap_err();
    assert!(err.contains("out of range"), "{err}");
    assert!(parse_duration("999999999999999999m").is_err());
    assert_eq!(
        parse_duration("18446744073709551615ms"),
        Ok(Duration::from_millis(u64::MAX))
    );
}

#[test]
fn change_kinds_parse_from_strings() {
    assert_eq!("created".parse::<ChangeKind>(), Ok(ChangeKind::Created));
    assert_eq!("Modify".parse::<ChangeKind>(), Ok(ChangeKind::Modified));
    assert_eq!("removed".parse::<ChangeKind>(), Ok(ChangeKind::Deleted));
    assert!("renamed".parse::<ChangeKind>().is_err());
}

#[test]
fn notify_events_map_to_change_kinds() {
    assert_eq!(
        change_kind(&EventKind::Create(CreateKind::File)),
        Some(ChangeKind::Created)
    );
    assert_eq!(
        change_kind(&EventKind::Modify(ModifyKind::Any)),
        Some(ChangeKind::Modified)
    );
    assert_eq!(
        change_kind(&EventKind::Remove(RemoveKind::File)),
        Some(ChangeKind::Deleted)
    );
    assert_eq!(
        change_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
        None
    );
    assert_eq!(change_kind(&EventKind::Access(AccessKind::Any)), None);
}

#[test]
fn relative_paths_are_normalized() {
    let root = std::path::Path::new("/site");
    assert_eq!(
        relative_str(root, std::path::Path::new("/site/app/bmi.md")).as_deref(),
        Some("app/bmi.md")
    );
    assert_eq!(
        relative_str(root, std::path::Path::new("./app/bmi.md")).as_deref(),
        Some("app/bmi.md")
    );
    assert_eq!(normalize_rel("/./a/b"), "a/b");
}

#[test]
fn default_config_file_name() {
    assert_eq!(default_config_path(), std::path::PathBuf::from("Sitewatch.toml"));
}
