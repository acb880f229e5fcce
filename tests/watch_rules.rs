mod common;

use std::sync::Arc;

use sitewatch::errors::SitewatchError;
use sitewatch::registry::TaskRegistry;
use sitewatch::watch::patterns::expand_pattern;
use sitewatch::watch::{PatternSet, WatchRuleEngine};
use sitewatch_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use sitewatch_test_utils::fake_actions::{ActionLog, RecordingAction};

use common::registry_with;

fn site_registry() -> Arc<TaskRegistry> {
    let log = ActionLog::new();
    Arc::new(registry_with(
        vec![
            ("markdown", RecordingAction::new("markdown", &log)),
            ("jekyll", RecordingAction::new("jekyll", &log)),
        ],
        &[
            ("server", &["markdown", "jekyll"]),
            ("jekyll", &["jekyll"]),
            ("reload", &[]),
        ],
    ))
}

fn set(patterns: &[&str]) -> PatternSet {
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
    PatternSet::new(&patterns, &[]).unwrap()
}

#[test]
fn markdown_rule_with_vendor_exclusion() {
    let mut engine = WatchRuleEngine::new(site_registry());
    engine.add_rule(&["**/*.md"], &["vendor/**"], "server").unwrap();

    assert_eq!(engine.match_path("app/bmi.md"), ["server"]);
    assert!(engine.match_path("app/vendor/readme.md").is_empty());
    assert!(engine.match_path("app/style.css").is_empty());
}

#[test]
fn unknown_recipe_fails_at_registration() {
    let mut engine = WatchRuleEngine::new(site_registry());
    let err = engine.add_rule(&["*.md"], &[], "ghost").unwrap_err();

    assert!(matches!(err, SitewatchError::UnknownRecipe(ref r) if r == "ghost"));
    assert!(engine.rules().is_empty());
}

#[test]
fn invalid_glob_is_a_config_error() {
    let mut engine = WatchRuleEngine::new(site_registry());
    let err = engine.add_rule(&["app/{a,b"], &[], "server").unwrap_err();
    assert!(matches!(err, SitewatchError::ConfigError(_)));
}

#[test]
fn all_matching_rules_contribute_in_order_without_duplicates() {
    let mut engine = WatchRuleEngine::new(site_registry());
    engine.add_rule(&["*.html"], &[], "reload").unwrap();
    engine.add_rule(&["app/**"], &[], "jekyll").unwrap();
    engine.add_rule(&["index.html"], &[], "reload").unwrap();

    assert_eq!(engine.match_path("app/index.html"), ["reload", "jekyll"]);
    assert_eq!(engine.match_path("app/_config.yml"), ["jekyll"]);
}

#[test]
fn negated_dot_slash_directory_excludes_subtree() {
    let mut engine = WatchRuleEngine::new(site_registry());
    engine
        .add_rule(&["**/*.{html,yml,md,mkd,markdown}", "_config.yml", "!./vendor"], &[], "jekyll")
        .unwrap();

    assert_eq!(engine.match_path("app/index.html"), ["jekyll"]);
    assert_eq!(engine.match_path("_config.yml"), ["jekyll"]);
    assert_eq!(engine.match_path("notes/todo.mkd"), ["jekyll"]);
    assert!(engine.match_path("vendor/readme.md").is_empty());
    assert!(engine.match_path("vendor/deep/page.html").is_empty());
}

#[test]
fn star_stays_within_one_segment() {
    let patterns = set(&["/app/*.md"]);
    assert!(patterns.matches("app/bmi.md"));
    assert!(!patterns.matches("app/notes/bmi.md"));
}

#[test]
fn leading_slash_anchors_at_root() {
    let patterns = set(&["/_config.yml"]);
    assert!(patterns.matches("_config.yml"));
    assert!(!patterns.matches("app/_config.yml"));

    let floating = set(&["_config.yml"]);
    assert!(floating.matches("app/_config.yml"));
}

#[test]
fn unanchored_patterns_float_across_segments() {
    let patterns = set(&["vendor/**"]);
    assert!(patterns.matches("vendor/a.js"));
    assert!(patterns.matches("app/vendor/readme.md"));
    assert!(!patterns.matches("vendors/a.js"));
}

#[test]
fn brace_alternation() {
    let patterns = set(&["styles/*.{css,scss}"]);
    assert!(patterns.matches("app/styles/site.css"));
    assert!(patterns.matches("app/styles/site.scss"));
    assert!(!patterns.matches("app/styles/site.less"));
}

#[test]
fn paths_are_normalized_before_matching() {
    let patterns = set(&["*.md"]);
    assert!(patterns.matches("./app/bmi.md"));
    assert!(patterns.matches("app\\bmi.md"));
}

#[test]
fn exclusion_only_applies_to_its_own_rule() {
    let mut engine = WatchRuleEngine::new(site_registry());
    engine.add_rule(&["**/*.md", "!vendor"], &[], "server").unwrap();
    engine.add_rule(&["vendor/*.md"], &[], "reload").unwrap();

    assert_eq!(engine.match_path("vendor/readme.md"), ["reload"]);
}

#[test]
fn expand_pattern_examples() {
    assert_eq!(expand_pattern("./vendor"), ["vendor", "vendor/**", "**/vendor", "**/vendor/**"]);
    assert_eq!(expand_pattern("/docs/**"), ["docs/**"]);
    assert_eq!(expand_pattern("**/*.md"), ["**/*.md", "**/*.md/**"]);
    assert_eq!(expand_pattern("**"), ["**"]);
}

#[test]
fn engine_from_config_registers_every_watch_section() {
    let cfg = ConfigFileBuilder::new()
        .with_var("app", "app")
        .with_task("lint", TaskConfigBuilder::command("echo lint").build())
        .with_recipe("lint", &["lint"])
        .with_recipe("reload", &[])
        .with_watch(&["${app}/**/*.js"], "lint")
        .with_hashed_watch(&["public/**/*.html"], "reload")
        .build();

    let log = ActionLog::new();
    let registry = Arc::new(registry_with(
        vec![("lint", RecordingAction::new("lint", &log))],
        &[("lint", &["lint"]), ("reload", &[])],
    ));

    let engine = WatchRuleEngine::from_config(&cfg, registry).unwrap();
    assert_eq!(engine.rules().len(), 2);
    assert!(!engine.rules()[0].use_hash());
    assert!(engine.rules()[1].use_hash());
    assert_eq!(engine.match_path("app/js/main.js"), ["lint"]);
    assert_eq!(engine.match_path("public/index.html"), ["reload"]);
}
