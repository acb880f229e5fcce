// src/watch/watcher.rs

use std::fmt::Debug;
use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::{ChangeEvent, ChangeKind};

/// Source of filesystem change events.
///
/// `start` begins delivering events for `root` into `tx` and returns a guard;
/// dropping the guard stops watching.
pub trait Watcher: Send + Sync + Debug {
    fn start(&self, root: PathBuf, tx: mpsc::Sender<ChangeEvent>) -> Result<WatcherHandle>;
}

/// Handle for a running watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: Option<Box<dyn Send>>,
}

impl WatcherHandle {
    pub fn new<T: Send + 'static>(inner: T) -> Self {
        Self {
            _inner: Some(Box::new(inner)),
        }
    }

    /// A handle that owns nothing, for watchers driven by hand.
    pub fn detached() -> Self {
        Self { _inner: None }
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Recursive OS-level watcher built on `notify`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatcher;

impl Watcher for NotifyWatcher {
    fn start(&self, root: PathBuf, tx: mpsc::Sender<ChangeEvent>) -> Result<WatcherHandle> {
        // Canonicalize once so we have a stable base path.
        let root = root.canonicalize().unwrap_or(root);

        // Channel from the blocking notify callback into the async world.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        eprintln!("sitewatch: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("sitewatch: file watch error: {err}");
                }
            },
            Config::default(),
        )
        .context("creating file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("watching {:?}", root))?;

        info!("file watcher started on {:?}", root);

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let Some(kind) = change_kind(&event.kind) else {
                    continue;
                };
                for path in event.paths {
                    if tx.send(ChangeEvent::new(path, kind)).await.is_err() {
                        warn!("change event receiver dropped; stopping watcher loop");
                        return;
                    }
                }
            }
            debug!("watcher event loop finished");
        });

        Ok(WatcherHandle::new(watcher))
    }
}

/// Map a notify event kind onto a [`ChangeKind`]; access and metadata-only
/// events are ignored.
pub fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}
