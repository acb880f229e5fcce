#![cfg(unix)]

use std::sync::Arc;

use sitewatch::engine::RunCoordinator;
use sitewatch::errors::SitewatchError;
use sitewatch::exec::command::shell_quote;
use sitewatch::exec::{CommandSiteGenerator, GenerateTask, ShellCommand, TaskAction};
use sitewatch::registry::{TaskOptions, TaskRegistry};
use sitewatch::reload::NoopReload;

#[tokio::test]
async fn shell_command_runs_in_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let cmd = ShellCommand::new("touch", "echo built > out.txt", dir.path());

    cmd.run().await.unwrap();
    let out = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(out.trim(), "built");
}

#[tokio::test]
async fn non_zero_exit_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let cmd = ShellCommand::new("fail", "exit 3", dir.path());

    let err = cmd.run().await.unwrap_err();
    assert!(err.to_string().contains("exited with code 3"), "{err}");
}

#[tokio::test]
async fn slow_command_is_killed_by_task_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = TaskRegistry::new();
    registry
        .register(
            "sleepy",
            Arc::new(ShellCommand::new("sleepy", "sleep 30", dir.path())),
            TaskOptions::default().with_timeout(std::time::Duration::from_millis(100)),
        )
        .unwrap();
    registry.add_recipe("build", &["sleepy"]).unwrap();

    let coordinator = RunCoordinator::new(Arc::new(registry), Arc::new(NoopReload));
    let started = std::time::Instant::now();
    let err = coordinator.trigger("build").await.unwrap_err();

    assert!(matches!(err, SitewatchError::RecipeExecution { ref task, .. } if task == "sleepy"));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[test]
fn generator_command_line_includes_paths_and_configs() {
    let generator = CommandSiteGenerator::new("jekyll", "bundle exec jekyll build", ".")
        .with_source(Some("app".to_string()))
        .with_destination(Some(".jekyll".to_string()))
        .with_config_files(vec!["_config.yml".to_string(), "_dev.yml".to_string()]);

    assert_eq!(
        generator.command_line(),
        "bundle exec jekyll build --source app --destination .jekyll --config _config.yml,_dev.yml"
    );
}

#[tokio::test]
async fn generate_task_runs_the_generator() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    let generator = CommandSiteGenerator::new("gen", "cp -r src", dir.path())
        .with_source(None)
        .with_destination(None);
    let task = GenerateTask::new(Arc::new(generator));

    // `cp -r src` without a destination fails; the failure must surface.
    assert!(task.run().await.is_err());
    assert!(task.describe().starts_with("generate: cp -r src"));
}

#[test]
fn shell_quote_leaves_plain_words_alone() {
    assert_eq!(shell_quote("app/_site"), "app/_site");
    assert_eq!(shell_quote("my site"), "'my site'");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
    assert_eq!(shell_quote(""), "''");
}
