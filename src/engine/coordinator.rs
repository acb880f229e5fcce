// src/engine/coordinator.rs

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, SitewatchError};
use crate::registry::{Task, TaskRegistry};
use crate::reload::ReloadChannel;

use super::state::{Begin, RunStates};
use super::{RecipeRunState, TriggerOutcome};

/// Runs recipes, one execution per recipe at a time.
///
/// Cheap to clone; clones share the same run state, so the watcher side can
/// hand a copy to every spawned trigger.
#[derive(Clone)]
pub struct RunCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<TaskRegistry>,
    states: RunStates,
    reload: Arc<dyn ReloadChannel>,
}

impl fmt::Debug for RunCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("active", &self.inner.states.active())
            .field("reload", &self.inner.reload)
            .finish_non_exhaustive()
    }
}

/// Puts the recipe back to idle if a run is dropped mid-flight (panic in an
/// action, or the trigger future being cancelled).
struct RunGuard<'a> {
    states: &'a RunStates,
    recipe: &'a str,
    armed: bool,
}

impl RunGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(recipe = %self.recipe, "recipe run interrupted; resetting state");
            self.states.reset(self.recipe);
        }
    }
}

impl RunCoordinator {
    pub fn new(registry: Arc<TaskRegistry>, reload: Arc<dyn ReloadChannel>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                states: RunStates::new(),
                reload,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.inner.registry
    }

    /// Run `recipe`, or fold this trigger into the run already in flight.
    ///
    /// Returns once the recipe (including any coalesced follow-up passes)
    /// finished, or immediately with [`TriggerOutcome::Coalesced`].
    pub async fn trigger(&self, recipe: &str) -> Result<TriggerOutcome> {
        let tasks = self.inner.registry.recipe(recipe)?;
        let states = &self.inner.states;

        if states.begin(recipe) == Begin::Coalesced {
            debug!(recipe = %recipe, "recipe already running; follow-up requested");
            return Ok(TriggerOutcome::Coalesced);
        }

        let guard = RunGuard {
            states,
            recipe,
            armed: true,
        };

        let mut runs = 0usize;
        loop {
            runs += 1;
            let started = Instant::now();
            info!(recipe = %recipe, pass = runs, tasks = tasks.len(), "running recipe");

            if let Err(err) = self.run_pass(recipe, &tasks).await {
                states.reset(recipe);
                guard.disarm();
                return Err(err);
            }

            info!(
                recipe = %recipe,
                pass = runs,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "recipe completed"
            );
            self.inner.reload.recipe_completed(recipe);

            if !states.finish_pass(recipe) {
                break;
            }
            debug!(recipe = %recipe, "changes arrived during run; running again");
        }

        guard.disarm();
        Ok(TriggerOutcome::Completed { runs })
    }

    async fn run_pass(&self, recipe: &str, tasks: &[Arc<Task>]) -> Result<()> {
        for task in tasks {
            debug!(recipe = %recipe, task = %task.name(), "starting task");
            let started = Instant::now();

            let fut = task.action().run();
            let outcome = match task.options().timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(anyhow::anyhow!("timed out after {limit:?}")),
                },
                None => fut.await,
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;

            if let Err(e) = outcome {
                warn!(recipe = %recipe, task = %task.name(), elapsed_ms, "task failed");
                return Err(SitewatchError::RecipeExecution {
                    recipe: recipe.to_string(),
                    task: task.name().to_string(),
                    reason: format!("{e:#}"),
                });
            }
            info!(recipe = %recipe, task = %task.name(), elapsed_ms, "task finished");
        }
        Ok(())
    }

    /// Fire-and-forget [`trigger`](Self::trigger) on the Tokio runtime;
    /// failures are logged, never propagated.
    pub fn spawn_trigger(&self, recipe: impl Into<String>) -> JoinHandle<()> {
        let coordinator = self.clone();
        let recipe = recipe.into();
        tokio::spawn(async move {
            match coordinator.trigger(&recipe).await {
                Ok(outcome) => debug!(recipe = %recipe, ?outcome, "trigger handled"),
                Err(err) => error!(recipe = %recipe, error = %err, "recipe failed"),
            }
        })
    }

    pub fn run_state(&self, recipe: &str) -> RecipeRunState {
        self.inner.states.run_state(recipe)
    }

    /// Names of recipes with a run in flight, sorted.
    pub fn active_recipes(&self) -> Vec<String> {
        self.inner.states.active()
    }
}
