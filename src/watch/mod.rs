// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` glob patterns into rules ([`WatchRuleEngine`]).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optionally ignoring changes that leave file content untouched (`use_hash`).
//! - Dispatching matched paths to the run coordinator.
//!
//! It does **not** run anything itself; it only turns filesystem changes into
//! recipe triggers.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::ChangeDispatcher;
pub use hash::{compute_file_hash, ContentHashes, HashKey};
pub use patterns::{PatternSet, WatchRule, WatchRuleEngine};
pub use watcher::{NotifyWatcher, Watcher, WatcherHandle};
