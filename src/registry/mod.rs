// src/registry/mod.rs

//! Task registry: named tasks plus named, ordered recipes.
//!
//! Populated once at startup (see [`builder`]) and read-only afterwards, so it
//! is shared between components as `Arc<TaskRegistry>` without locking.

pub mod builder;
pub mod task;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, SitewatchError};
use crate::exec::TaskAction;
use crate::types::{RecipeName, TaskName};

pub use builder::build_registry;
pub use task::{Task, TaskOptions};

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskName, Arc<Task>>,
    /// Recipe name -> ordered task names. Every name is known to `tasks`.
    recipes: BTreeMap<RecipeName, Vec<TaskName>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under a unique name.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        action: Arc<dyn TaskAction>,
        options: TaskOptions,
    ) -> Result<()> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(SitewatchError::DuplicateTask(name));
        }

        debug!(task = %name, action = %action.describe(), "registered task");
        let task = Task::new(name.clone(), action, options);
        self.tasks.insert(name, Arc::new(task));
        Ok(())
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Result<Arc<Task>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| SitewatchError::UnknownTask(name.to_string()))
    }

    /// Resolve an ordered list of task names into tasks, preserving order.
    pub fn resolve_recipe<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<Task>>> {
        names.iter().map(|n| self.get(n.as_ref())).collect()
    }

    /// Store a named recipe. Every task must already be registered.
    pub fn add_recipe<S: AsRef<str>>(
        &mut self,
        name: impl Into<RecipeName>,
        task_names: &[S],
    ) -> Result<()> {
        let name = name.into();
        // Fail now rather than at trigger time.
        self.resolve_recipe(task_names)?;

        let ordered: Vec<TaskName> = task_names.iter().map(|n| n.as_ref().to_string()).collect();
        debug!(recipe = %name, tasks = ?ordered, "registered recipe");
        self.recipes.insert(name, ordered);
        Ok(())
    }

    /// Tasks of a named recipe, in execution order.
    pub fn recipe(&self, name: &str) -> Result<Vec<Arc<Task>>> {
        let names = self
            .recipes
            .get(name)
            .ok_or_else(|| SitewatchError::UnknownRecipe(name.to_string()))?;
        self.resolve_recipe(names.as_slice())
    }

    /// Ordered task names of a recipe, if it exists.
    pub fn recipe_tasks(&self, name: &str) -> Option<&[TaskName]> {
        self.recipes.get(name).map(|v| v.as_slice())
    }

    pub fn has_recipe(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn recipe_names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(|s| s.as_str())
    }

    /// Task names, sorted for stable output.
    pub fn task_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
