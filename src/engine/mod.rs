// src/engine/mod.rs

//! Recipe execution.
//!
//! [`RunCoordinator`] is the single entry point: every trigger, whether from
//! startup or a file change, goes through [`RunCoordinator::trigger`]. It
//! guarantees at most one active run per recipe and collapses triggers that
//! arrive mid-run into one follow-up pass. The bookkeeping lives in
//! [`state`].

pub mod coordinator;
pub mod state;

pub use coordinator::RunCoordinator;
pub use state::{RunState, RunStates};

/// Result of a successful [`RunCoordinator::trigger`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// This call ran the recipe `runs` times (1 + coalesced follow-ups).
    Completed { runs: usize },
    /// A run was already in flight; it will run once more when done.
    Coalesced,
}

/// Observable state of one recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeRunState {
    Idle,
    Running,
    /// Running, with a follow-up pass requested.
    RunningWithPending,
}
