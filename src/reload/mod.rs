// src/reload/mod.rs

//! Live-reload notification.
//!
//! The coordinator calls [`ReloadChannel::recipe_completed`] after every
//! successful recipe pass; implementations tell connected browsers to
//! refresh.

pub mod websocket;

use std::fmt::Debug;

pub use websocket::{WebSocketReload, LIVERELOAD_PROTOCOL};

/// Sink for "a recipe finished, reload the page" notifications.
///
/// Called synchronously from the coordinator; implementations must not
/// block for long.
pub trait ReloadChannel: Send + Sync + Debug {
    fn recipe_completed(&self, recipe: &str);
}

/// Channel that drops every notification (live reload disabled, `--once`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReload;

impl ReloadChannel for NoopReload {
    fn recipe_completed(&self, recipe: &str) {
        tracing::trace!(recipe = %recipe, "live reload disabled; notification dropped");
    }
}
