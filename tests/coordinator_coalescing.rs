mod common;

use std::sync::Arc;

use proptest::prelude::*;
use sitewatch::engine::{RecipeRunState, TriggerOutcome};
use sitewatch_test_utils::fake_actions::{
    ActionLog, FailingAction, GatedAction, RecordingAction, RecordingReload,
};
use sitewatch_test_utils::{with_timeout, LogCapture};

use common::{coordinator, init_tracing, registry_with};

#[tokio::test]
async fn idle_trigger_runs_once_and_notifies() {
    init_tracing();
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let coordinator = coordinator(
        registry_with(
            vec![("A", RecordingAction::new("A", &log))],
            &[("build", &["A"])],
        ),
        reload.clone(),
    );

    let outcome = coordinator.trigger("build").await.unwrap();

    assert_eq!(outcome, TriggerOutcome::Completed { runs: 1 });
    assert_eq!(log.entries(), ["A"]);
    assert_eq!(reload.completed(), ["build"]);
    assert_eq!(coordinator.run_state("build"), RecipeRunState::Idle);
}

#[tokio::test]
async fn triggers_during_a_run_collapse_into_one_follow_up() {
    init_tracing();
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let (gated, gate) = GatedAction::new("A", &log);
    let coordinator = coordinator(
        registry_with(
            vec![("A", gated), ("B", RecordingAction::new("B", &log))],
            &[("build", &["A", "B"])],
        ),
        reload.clone(),
    );

    let first = {
        let c = coordinator.clone();
        tokio::spawn(async move { c.trigger("build").await })
    };
    with_timeout(gate.wait_started()).await;
    assert_eq!(coordinator.run_state("build"), RecipeRunState::Running);

    for _ in 0..5 {
        let outcome = coordinator.trigger("build").await.unwrap();
        assert_eq!(outcome, TriggerOutcome::Coalesced);
    }
    assert_eq!(coordinator.run_state("build"), RecipeRunState::RunningWithPending);

    gate.open();
    let outcome = with_timeout(first).await.unwrap().unwrap();

    assert_eq!(outcome, TriggerOutcome::Completed { runs: 2 });
    assert_eq!(log.entries(), ["A", "B", "A", "B"]);
    assert_eq!(reload.count_for("build"), 2);
    assert_eq!(coordinator.run_state("build"), RecipeRunState::Idle);
}

#[tokio::test]
async fn different_recipes_run_concurrently() {
    init_tracing();
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let (gated, gate) = GatedAction::new("slow", &log);
    let coordinator = coordinator(
        registry_with(
            vec![("slow", gated), ("fast", RecordingAction::new("fast", &log))],
            &[("R", &["slow"]), ("S", &["fast"])],
        ),
        reload.clone(),
    );

    let r = coordinator.spawn_trigger("R");
    with_timeout(gate.wait_started()).await;

    // S is not blocked by R's in-flight run.
    let outcome = with_timeout(coordinator.trigger("S")).await.unwrap();
    assert_eq!(outcome, TriggerOutcome::Completed { runs: 1 });
    assert_eq!(reload.completed(), ["S"]);
    assert_eq!(coordinator.active_recipes(), ["R"]);

    gate.open();
    with_timeout(r).await.unwrap();
    assert_eq!(reload.completed(), ["S", "R"]);
}

#[tokio::test]
async fn trigger_after_completion_starts_a_fresh_run() {
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let coordinator = coordinator(
        registry_with(
            vec![("A", RecordingAction::new("A", &log))],
            &[("build", &["A"])],
        ),
        reload.clone(),
    );

    for _ in 0..3 {
        let outcome = coordinator.trigger("build").await.unwrap();
        assert_eq!(outcome, TriggerOutcome::Completed { runs: 1 });
    }
    assert_eq!(log.count("A"), 3);
    assert_eq!(reload.count_for("build"), 3);
}

#[tokio::test]
async fn empty_recipe_still_notifies() {
    let reload = RecordingReload::new();
    let coordinator = coordinator(registry_with(vec![], &[("reload", &[])]), reload.clone());

    coordinator.trigger("reload").await.unwrap();
    assert_eq!(reload.completed(), ["reload"]);
}

#[tokio::test]
async fn unknown_recipe_is_rejected_without_state() {
    let coordinator = coordinator(registry_with(vec![], &[]), RecordingReload::new());

    let err = coordinator.trigger("ghost").await.unwrap_err();
    assert!(matches!(err, sitewatch::errors::SitewatchError::UnknownRecipe(_)));
    assert!(coordinator.active_recipes().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_triggers_across_threads_start_one_run() {
    init_tracing();
    const CALLERS: usize = 16;
    let log = ActionLog::new();
    let reload = RecordingReload::new();
    let (gated, gate) = GatedAction::new("A", &log);
    let coordinator = coordinator(
        registry_with(vec![("A", gated)], &[("build", &["A"])]),
        reload.clone(),
    );

    let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for _ in 0..CALLERS {
        let c = coordinator.clone();
        let barrier = Arc::clone(&barrier);
        let tx = tx.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            let outcome = c.trigger("build").await.unwrap();
            tx.send(outcome).unwrap();
        });
    }
    drop(tx);

    with_timeout(gate.wait_started()).await;
    for _ in 0..CALLERS - 1 {
        let outcome = with_timeout(rx.recv()).await.unwrap();
        assert_eq!(outcome, TriggerOutcome::Coalesced);
    }
    assert_eq!(gate.starts(), 1);
    assert_eq!(coordinator.run_state("build"), RecipeRunState::RunningWithPending);

    gate.open();
    let last = with_timeout(rx.recv()).await.unwrap();
    assert_eq!(last, TriggerOutcome::Completed { runs: 2 });
    assert_eq!(gate.starts(), 2);
    assert_eq!(reload.count_for("build"), 2);
    assert_eq!(coordinator.run_state("build"), RecipeRunState::Idle);
}

#[test]
fn every_task_logs_its_elapsed_time() {
    let capture = LogCapture::new();
    let log = ActionLog::new();
    let coordinator = coordinator(
        registry_with(
            vec![
                ("A", RecordingAction::new("A", &log)),
                ("B", RecordingAction::new("B", &log)),
            ],
            &[("build", &["A", "B"])],
        ),
        RecordingReload::new(),
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    capture.scoped(|| rt.block_on(coordinator.trigger("build")).unwrap());

    let finished = capture.lines_with("task finished");
    assert_eq!(finished.len(), 2, "{}", capture.contents());
    assert!(finished[0].contains("task=A") && finished[0].contains("elapsed_ms="));
    assert!(finished[1].contains("task=B") && finished[1].contains("elapsed_ms="));
}

#[test]
fn failing_task_logs_its_elapsed_time() {
    let capture = LogCapture::new();
    let log = ActionLog::new();
    let coordinator = coordinator(
        registry_with(
            vec![("A", FailingAction::new("A", &log))],
            &[("build", &["A"])],
        ),
        RecordingReload::new(),
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    assert!(capture.scoped(|| rt.block_on(coordinator.trigger("build"))).is_err());

    let failed = capture.lines_with("task failed");
    assert_eq!(failed.len(), 1, "{}", capture.contents());
    assert!(failed[0].contains("elapsed_ms="));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_burst_during_a_run_yields_exactly_one_extra_run(burst in 1usize..25) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (runs, starts, notified) = rt.block_on(async move {
            let log = ActionLog::new();
            let reload = RecordingReload::new();
            let (gated, gate) = GatedAction::new("A", &log);
            let coordinator = coordinator(
                registry_with(vec![("A", gated)], &[("build", &["A"])]),
                reload.clone(),
            );

            let first = {
                let c = coordinator.clone();
                tokio::spawn(async move { c.trigger("build").await })
            };
            with_timeout(gate.wait_started()).await;

            for _ in 0..burst {
                assert_eq!(
                    coordinator.trigger("build").await.unwrap(),
                    TriggerOutcome::Coalesced
                );
            }

            gate.open();
            let outcome = with_timeout(first).await.unwrap().unwrap();
            let runs = match outcome {
                TriggerOutcome::Completed { runs } => runs,
                TriggerOutcome::Coalesced => 0,
            };
            (runs, gate.starts(), reload.count_for("build"))
        });

        prop_assert_eq!(runs, 2);
        prop_assert_eq!(starts, 2);
        prop_assert_eq!(notified, 2);
    }
}

#[test]
fn coordinator_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync + Clone>() {}
    assert_send_sync::<sitewatch::engine::RunCoordinator>();
}
