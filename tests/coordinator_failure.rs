mod common;

use std::sync::Arc;
use std::time::Duration;

use sitewatch::engine::{RecipeRunState, TriggerOutcome};
use sitewatch::errors::SitewatchError;
use sitewatch::registry::{TaskOptions, TaskRegistry};
use sitewatch_test_utils::fake_actions::{
    ActionLog, FailingAction, GatedAction, RecordingAction, RecordingReload, SleepAction,
};
use sitewatch_test_utils::with_timeout;

use common::{coordinator, init_tracing, registry_with};

#[tokio::test]
async fn failure_aborts_remaining_tasks_and_names_the_task() {
    init_tracing();
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let coordinator = coordinator(
        registry_with(
            vec![
                ("A", RecordingAction::new("A", &log)),
                ("boom", FailingAction::new("boom", &log)),
                ("C", RecordingAction::new("C", &log)),
            ],
            &[("build", &["A", "boom", "C"])],
        ),
        reload.clone(),
    );

    let err = coordinator.trigger("build").await.unwrap_err();

    match err {
        SitewatchError::RecipeExecution {
            recipe,
            task,
            reason,
        } => {
            assert_eq!(recipe, "build");
            assert_eq!(task, "boom");
            assert!(reason.contains("boom exploded"), "reason: {reason}");
        }
        other => panic!("expected RecipeExecution, got {other:?}"),
    }
    assert_eq!(log.entries(), ["A", "boom"]);
    assert!(reload.completed().is_empty());
    assert_eq!(coordinator.run_state("build"), RecipeRunState::Idle);
}

#[tokio::test]
async fn failing_recipe_does_not_affect_another() {
    init_tracing();
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let (gated, gate) = GatedAction::new("slow", &log);
    let coordinator = coordinator(
        registry_with(
            vec![("slow", gated), ("boom", FailingAction::new("boom", &log))],
            &[("R", &["boom"]), ("S", &["slow"])],
        ),
        reload.clone(),
    );

    let s = {
        let c = coordinator.clone();
        tokio::spawn(async move { c.trigger("S").await })
    };
    with_timeout(gate.wait_started()).await;

    let r = coordinator.trigger("R").await;
    assert!(matches!(r, Err(SitewatchError::RecipeExecution { .. })));

    gate.open();
    let outcome = with_timeout(s).await.unwrap().unwrap();
    assert_eq!(outcome, TriggerOutcome::Completed { runs: 1 });
    assert_eq!(reload.completed(), ["S"]);
}

#[tokio::test]
async fn spawned_failures_are_logged_not_propagated() {
    init_tracing();
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let coordinator = coordinator(
        registry_with(
            vec![
                ("boom", FailingAction::new("boom", &log)),
                ("ok", RecordingAction::new("ok", &log)),
            ],
            &[("R", &["boom"]), ("S", &["ok"])],
        ),
        reload.clone(),
    );

    let r = coordinator.spawn_trigger("R");
    let s = coordinator.spawn_trigger("S");
    with_timeout(r).await.unwrap();
    with_timeout(s).await.unwrap();

    assert_eq!(reload.completed(), ["S"]);
}

#[tokio::test]
async fn timeout_counts_as_failure() {
    init_tracing();
    let log = ActionLog::new();
    let reload = RecordingReload::new();

    let mut registry = TaskRegistry::new();
    registry
        .register(
            "slow",
            SleepAction::new("slow", &log, Duration::from_secs(30)),
            TaskOptions::default().with_timeout(Duration::from_millis(20)),
        )
        .unwrap();
    registry
        .register("after", RecordingAction::new("after", &log), TaskOptions::default())
        .unwrap();
    registry.add_recipe("build", &["slow", "after"]).unwrap();

    let coordinator = coordinator(registry, reload.clone());
    let err = with_timeout(coordinator.trigger("build")).await.unwrap_err();

    match err {
        SitewatchError::RecipeExecution { task, reason, .. } => {
            assert_eq!(task, "slow");
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("expected RecipeExecution, got {other:?}"),
    }
    assert!(log.entries().is_empty());
    assert!(reload.completed().is_empty());
}

#[tokio::test]
async fn failure_drops_the_pending_follow_up() {
    init_tracing();
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let (gated, gate) = GatedAction::new("A", &log);
    let coordinator = coordinator(
        registry_with(
            vec![("A", gated), ("boom", FailingAction::new("boom", &log))],
            &[("build", &["A", "boom"])],
        ),
        reload.clone(),
    );

    let first = {
        let c = coordinator.clone();
        tokio::spawn(async move { c.trigger("build").await })
    };
    with_timeout(gate.wait_started()).await;
    assert_eq!(
        coordinator.trigger("build").await.unwrap(),
        TriggerOutcome::Coalesced
    );

    gate.open();
    let result = with_timeout(first).await.unwrap();

    assert!(result.is_err());
    assert_eq!(gate.starts(), 1);
    assert_eq!(log.entries(), ["A", "boom"]);
    assert_eq!(coordinator.run_state("build"), RecipeRunState::Idle);
    assert!(reload.completed().is_empty());
}

#[tokio::test]
async fn recipe_can_run_again_after_failure() {
    let log = ActionLog::new();
    let coordinator = coordinator(
        registry_with(
            vec![("boom", FailingAction::new("boom", &log))],
            &[("build", &["boom"])],
        ),
        Arc::new(sitewatch::reload::NoopReload),
    );

    assert!(coordinator.trigger("build").await.is_err());
    assert!(coordinator.trigger("build").await.is_err());
    assert_eq!(log.count("boom"), 2);
}

#[tokio::test]
async fn cancelled_run_resets_state() {
    let log = ActionLog::new();
    let (gated, gate) = GatedAction::new("A", &log);
    let coordinator = coordinator(
        registry_with(vec![("A", gated)], &[("build", &["A"])]),
        Arc::new(sitewatch::reload::NoopReload),
    );

    let first = {
        let c = coordinator.clone();
        tokio::spawn(async move { c.trigger("build").await })
    };
    with_timeout(gate.wait_started()).await;
    assert_eq!(coordinator.run_state("build"), RecipeRunState::Running);

    first.abort();
    let _ = first.await;

    assert_eq!(coordinator.run_state("build"), RecipeRunState::Idle);
}
