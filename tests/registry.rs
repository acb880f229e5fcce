mod common;

use std::sync::Arc;

use sitewatch::errors::SitewatchError;
use sitewatch::registry::{TaskOptions, TaskRegistry};
use sitewatch::reload::NoopReload;
use sitewatch_test_utils::fake_actions::{ActionLog, RecordingAction};

use common::{coordinator, init_tracing, registry_with};

#[test]
fn duplicate_task_is_rejected() {
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry
        .register("markdown", RecordingAction::new("a", &log), TaskOptions::default())
        .unwrap();

    let err = registry
        .register("markdown", RecordingAction::new("b", &log), TaskOptions::default())
        .unwrap_err();
    assert!(matches!(err, SitewatchError::DuplicateTask(ref n) if n == "markdown"));
    assert!(err.is_configuration_error());
}

#[test]
fn get_unknown_task_fails() {
    let registry = TaskRegistry::new();
    match registry.get("nope") {
        Err(SitewatchError::UnknownTask(name)) => assert_eq!(name, "nope"),
        other => panic!("expected UnknownTask, got {other:?}"),
    }
}

#[test]
fn resolve_recipe_preserves_order() {
    let log = ActionLog::new();
    let registry = registry_with(
        vec![
            ("c", RecordingAction::new("C", &log)),
            ("a", RecordingAction::new("A", &log)),
            ("b", RecordingAction::new("B", &log)),
        ],
        &[],
    );

    let tasks = registry.resolve_recipe(&["b", "a", "c"]).unwrap();
    let names: Vec<&str> = tasks.iter().map(|t| t.name()).collect();
    assert_eq!(names, ["b", "a", "c"]);
}

#[test]
fn resolve_recipe_reports_unknown_task() {
    let log = ActionLog::new();
    let registry = registry_with(vec![("a", RecordingAction::new("A", &log))], &[]);

    let err = registry.resolve_recipe(&["a", "ghost"]).unwrap_err();
    assert!(matches!(err, SitewatchError::UnknownTask(ref n) if n == "ghost"));
}

#[test]
fn add_recipe_fails_on_unknown_task() {
    let mut registry = TaskRegistry::new();
    let err = registry.add_recipe("serve", &["missing"]).unwrap_err();
    assert!(matches!(err, SitewatchError::UnknownTask(_)));
    assert!(!registry.has_recipe("serve"));
}

#[test]
fn unknown_recipe_lookup_fails() {
    let registry = TaskRegistry::new();
    assert!(matches!(
        registry.recipe("serve"),
        Err(SitewatchError::UnknownRecipe(_))
    ));
}

#[test]
fn empty_recipe_is_allowed() {
    let mut registry = TaskRegistry::new();
    registry.add_recipe("reload", &[] as &[&str]).unwrap();
    assert!(registry.recipe("reload").unwrap().is_empty());
    assert_eq!(registry.recipe_names().collect::<Vec<_>>(), ["reload"]);
}

#[tokio::test]
async fn recipe_runs_tasks_in_declared_order() {
    init_tracing();
    let log = ActionLog::new();
    let registry = registry_with(
        vec![
            ("A", RecordingAction::new("A", &log)),
            ("B", RecordingAction::new("B", &log)),
            ("C", RecordingAction::new("C", &log)),
        ],
        &[("build", &["A", "B", "C"])],
    );

    let coordinator = coordinator(registry, Arc::new(NoopReload));
    coordinator.trigger("build").await.unwrap();

    assert_eq!(log.entries(), ["A", "B", "C"]);
}

#[tokio::test]
async fn closures_can_be_registered_as_actions() {
    let log = ActionLog::new();
    let seen = log.clone();
    let action = sitewatch::exec::action_fn("closure", move || {
        let seen = seen.clone();
        async move {
            seen.push("closure");
            Ok(())
        }
    });
    assert_eq!(action.describe(), "closure");

    let registry = registry_with(vec![("c", action)], &[("r", &["c"])]);
    coordinator(registry, Arc::new(NoopReload))
        .trigger("r")
        .await
        .unwrap();
    assert_eq!(log.entries(), ["closure"]);
}
