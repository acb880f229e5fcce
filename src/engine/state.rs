// src/engine/state.rs

//! Per-recipe run bookkeeping.
//!
//! Every transition is a single critical section on one `std::sync::Mutex`;
//! the lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::types::RecipeName;

use super::RecipeRunState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    pub active: bool,
    pub rerun_requested: bool,
}

/// What the caller of [`RunStates::begin`] should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// The recipe was idle and is now marked active; the caller runs it.
    Started,
    /// A run is in flight; a follow-up pass has been requested.
    Coalesced,
}

#[derive(Debug, Default)]
pub struct RunStates {
    inner: Mutex<HashMap<RecipeName, RunState>>,
}

impl RunStates {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RecipeName, RunState>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check-and-set: mark `recipe` active if idle, otherwise request a rerun.
    pub fn begin(&self, recipe: &str) -> Begin {
        let mut states = self.lock();
        let state = states.entry(recipe.to_string()).or_default();
        if state.active {
            state.rerun_requested = true;
            Begin::Coalesced
        } else {
            state.active = true;
            state.rerun_requested = false;
            Begin::Started
        }
    }

    /// Called after a successful pass. Returns `true` (and consumes the flag)
    /// if another pass was requested; otherwise the recipe goes idle.
    pub fn finish_pass(&self, recipe: &str) -> bool {
        let mut states = self.lock();
        let Some(state) = states.get_mut(recipe) else {
            return false;
        };

        if state.rerun_requested {
            state.rerun_requested = false;
            true
        } else {
            states.remove(recipe);
            false
        }
    }

    /// Return `recipe` to idle, discarding any pending rerun.
    pub fn reset(&self, recipe: &str) {
        self.lock().remove(recipe);
    }

    pub fn get(&self, recipe: &str) -> RunState {
        self.lock().get(recipe).copied().unwrap_or_default()
    }

    pub fn run_state(&self, recipe: &str) -> RecipeRunState {
        match self.get(recipe) {
            RunState { active: false, .. } => RecipeRunState::Idle,
            RunState {
                active: true,
                rerun_requested: false,
            } => RecipeRunState::Running,
            RunState {
                active: true,
                rerun_requested: true,
            } => RecipeRunState::RunningWithPending,
        }
    }

    /// Recipes currently marked active, sorted.
    pub fn active(&self) -> Vec<RecipeName> {
        let mut names: Vec<RecipeName> = self
            .lock()
            .iter()
            .filter(|(_, s)| s.active)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }
}
