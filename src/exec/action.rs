// src/exec/action.rs

//! The opaque action a task delegates to.
//!
//! The coordinator only sees success or failure. Concrete adapters live in the
//! sibling modules; tests plug in closures via [`action_fn`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;

/// Boxed, sendable future borrowed from `self`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A unit of build work.
pub trait TaskAction: Send + Sync {
    /// Perform the work once. The returned future is awaited to completion
    /// before the next task of the recipe starts.
    fn run(&self) -> BoxFuture<'_, Result<()>>;

    /// Short human-readable description for logs and `--dry-run`.
    fn describe(&self) -> String {
        "opaque action".to_string()
    }
}

/// Adapter turning an async closure into a [`TaskAction`].
pub struct FnAction<F> {
    f: F,
    label: String,
}

impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin((self.f)())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Wrap an async closure as a shareable task action.
pub fn action_fn<F, Fut>(label: impl Into<String>, f: F) -> Arc<dyn TaskAction>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnAction {
        f,
        label: label.into(),
    })
}
