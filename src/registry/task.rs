// src/registry/task.rs

//! Task metadata stored in the registry.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::exec::TaskAction;
use crate::types::TaskName;

/// Declared options of a task.
///
/// These are the options every task kind understands; kind-specific settings
/// (markdown file maps, server roots, ...) are baked into the action itself
/// when it is built from config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Output path the task writes to.
    pub destination: Option<PathBuf>,
    /// Listen port for tasks that serve something.
    pub port: Option<u16>,
    /// Glob list of input paths the task consumes.
    pub watched_paths: Vec<String>,
    /// Upper bound for a single execution; expiry counts as failure.
    pub timeout: Option<Duration>,
}

impl TaskOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A registered task: a name, an opaque action and its options.
///
/// Immutable after registration; shared by reference between the registry and
/// any running recipe.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    action: Arc<dyn TaskAction>,
    options: TaskOptions,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("action", &self.action.describe())
            .field("options", &self.options)
            .finish()
    }
}

impl Task {
    pub fn new(name: impl Into<TaskName>, action: Arc<dyn TaskAction>, options: TaskOptions) -> Self {
        Self {
            name: name.into(),
            action,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &Arc<dyn TaskAction> {
        &self.action
    }

    pub fn options(&self) -> &TaskOptions {
        &self.options
    }
}
