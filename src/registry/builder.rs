// src/registry/builder.rs

use tracing::info;

use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::exec::{build_action, ActionContext};
use crate::registry::TaskRegistry;

/// Build the registry from a validated config: every task first, then every
/// recipe (so recipe references are resolved against the full task table).
pub fn build_registry(cfg: &ConfigFile, ctx: &ActionContext) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();

    for (name, task) in cfg.tasks() {
        let action = build_action(name, task, ctx)?;
        registry.register(name.clone(), action, task.options()?)?;
    }

    for (name, tasks) in cfg.recipes() {
        registry.add_recipe(name.clone(), tasks.as_slice())?;
    }

    info!(
        tasks = cfg.tasks().len(),
        recipes = cfg.recipes().len(),
        "task registry ready"
    );
    Ok(registry)
}
