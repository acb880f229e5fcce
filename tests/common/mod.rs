#![allow(dead_code)]

use std::sync::Arc;

use sitewatch::engine::RunCoordinator;
use sitewatch::exec::TaskAction;
use sitewatch::registry::{TaskOptions, TaskRegistry};
use sitewatch::reload::ReloadChannel;

pub use sitewatch_test_utils::init_tracing;

/// Registry holding the given tasks (default options) and recipes.
pub fn registry_with(
    tasks: Vec<(&str, Arc<dyn TaskAction>)>,
    recipes: &[(&str, &[&str])],
) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    for (name, action) in tasks {
        registry
            .register(name, action, TaskOptions::default())
            .unwrap();
    }
    for &(name, task_names) in recipes {
        registry.add_recipe(name, task_names).unwrap();
    }
    registry
}

pub fn coordinator(registry: TaskRegistry, reload: Arc<dyn ReloadChannel>) -> RunCoordinator {
    RunCoordinator::new(Arc::new(registry), reload)
}
