// src/watch/event_handler.rs

//! Turns change events into recipe triggers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{RunCoordinator, TriggerOutcome};
use crate::fs::{walk_files, FileSystem};
use crate::types::{ChangeEvent, ChangeKind, RecipeName};
use crate::watch::hash::{compute_file_hash, ContentHashes, HashKey};
use crate::watch::path_utils::{relative_str, to_slash};
use crate::watch::patterns::WatchRuleEngine;

/// Routes each [`ChangeEvent`] through the rule engine (and, for `use_hash`
/// rules, the content hash filter) to [`RunCoordinator::trigger`].
#[derive(Debug, Clone)]
pub struct ChangeDispatcher {
    root: PathBuf,
    engine: Arc<WatchRuleEngine>,
    coordinator: RunCoordinator,
    fs: Arc<dyn FileSystem>,
    hashes: Arc<ContentHashes>,
}

impl ChangeDispatcher {
    pub fn new(
        root: impl Into<PathBuf>,
        engine: Arc<WatchRuleEngine>,
        coordinator: RunCoordinator,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            root: root.into(),
            engine,
            coordinator,
            fs,
            hashes: Arc::new(ContentHashes::new()),
        }
    }

    pub fn hashes(&self) -> &ContentHashes {
        &self.hashes
    }

    /// Record the current content hash of every file watched by a
    /// `use_hash` rule, so the first save of an untouched file is ignored.
    pub async fn prime(&self) -> Result<usize> {
        let hashed: Vec<usize> = self
            .engine
            .rules()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.use_hash())
            .map(|(i, _)| i)
            .collect();
        if hashed.is_empty() {
            return Ok(0);
        }

        let root = self.root.clone();
        let engine = Arc::clone(&self.engine);
        let fs = Arc::clone(&self.fs);
        let hashes = Arc::clone(&self.hashes);

        let primed = tokio::task::spawn_blocking(move || -> Result<usize> {
            let mut primed = 0usize;
            for path in walk_files(fs.as_ref(), &root)? {
                let Ok(rel) = path.strip_prefix(&root) else {
                    continue;
                };
                let rel = to_slash(rel);
                let rules = engine.rules();
                let mut file_hash: Option<String> = None;

                for &idx in &hashed {
                    if !rules[idx].matches(&rel) {
                        continue;
                    }
                    if file_hash.is_none() {
                        match compute_file_hash(fs.as_ref(), &path) {
                            Ok(h) => file_hash = Some(h),
                            Err(e) => {
                                debug!(path = %rel, error = %e, "skipping unhashable file");
                                break;
                            }
                        }
                    }
                    if let Some(h) = &file_hash {
                        hashes.record(idx, &rel, h.clone());
                        primed += 1;
                    }
                }
            }
            Ok(primed)
        })
        .await??;

        info!(entries = primed, "primed content hashes");
        Ok(primed)
    }

    /// Recipes a change should trigger, after path normalization and hash
    /// filtering. Does not trigger anything.
    pub async fn recipes_for(&self, event: &ChangeEvent) -> Vec<RecipeName> {
        self.plan(event)
            .await
            .into_iter()
            .map(|planned| planned.recipe)
            .collect()
    }

    async fn plan(&self, event: &ChangeEvent) -> Vec<Planned> {
        let Some(rel) = relative_str(&self.root, &event.path) else {
            warn!(path = ?event.path, root = ?self.root, "could not relativize path");
            return Vec::new();
        };
        if rel.is_empty() {
            return Vec::new();
        }

        let matching: Vec<(usize, bool, &str)> = self
            .engine
            .rules()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(&rel))
            .map(|(i, r)| (i, r.use_hash(), r.recipe()))
            .collect();
        if matching.is_empty() {
            return Vec::new();
        }

        let needs_hash = matching.iter().any(|(_, use_hash, _)| *use_hash);
        let current = if needs_hash {
            self.current_hash(&rel, event).await
        } else {
            HashState::NotNeeded
        };

        let mut planned: Vec<Planned> = Vec::new();
        for (idx, use_hash, recipe) in matching {
            if use_hash {
                let changed = match &current {
                    HashState::Present(h) => self.hashes.update(idx, &rel, Some(h.clone())),
                    HashState::Gone => self.hashes.update(idx, &rel, None),
                    HashState::Unknown | HashState::NotNeeded => true,
                };
                if !changed {
                    debug!(path = %rel, recipe = %recipe, "content unchanged; skipping");
                    continue;
                }
            }

            let entry = match planned.iter().position(|p| p.recipe == recipe) {
                Some(pos) => &mut planned[pos],
                None => {
                    planned.push(Planned {
                        recipe: recipe.to_string(),
                        hash_keys: Vec::new(),
                    });
                    let last = planned.len() - 1;
                    &mut planned[last]
                }
            };
            if use_hash {
                entry.hash_keys.push((idx, rel.clone()));
            }
        }
        planned
    }

    async fn current_hash(&self, rel: &str, event: &ChangeEvent) -> HashState {
        if event.kind == ChangeKind::Deleted {
            return HashState::Gone;
        }

        let abs = absolute(&self.root, &event.path);
        let fs = Arc::clone(&self.fs);
        let result = tokio::task::spawn_blocking(move || {
            if !fs.is_file(&abs) {
                return Ok(None);
            }
            compute_file_hash(fs.as_ref(), &abs).map(Some)
        })
        .await;

        match result {
            Ok(Ok(Some(h))) => HashState::Present(h),
            Ok(Ok(None)) => HashState::Gone,
            Ok(Err(e)) => {
                warn!(path = %rel, error = %e, "failed to hash file; triggering anyway");
                HashState::Unknown
            }
            Err(e) => {
                warn!(path = %rel, error = %e, "hashing task failed; triggering anyway");
                HashState::Unknown
            }
        }
    }

    /// Handle one event: spawn a trigger for every matching recipe.
    ///
    /// Content hashes recorded for this change are dropped again if the
    /// recipe fails.
    pub async fn handle(&self, event: &ChangeEvent) -> Vec<JoinHandle<()>> {
        let planned = self.plan(event).await;
        if !planned.is_empty() {
            let recipes: Vec<&str> = planned.iter().map(|p| p.recipe.as_str()).collect();
            info!(path = ?event.path, kind = ?event.kind, ?recipes, "change detected");
        }
        planned
            .into_iter()
            .map(|planned| self.spawn_trigger(planned))
            .collect()
    }

    fn spawn_trigger(&self, planned: Planned) -> JoinHandle<()> {
        let coordinator = self.coordinator.clone();
        let hashes = Arc::clone(&self.hashes);
        let Planned { recipe, hash_keys } = planned;

        tokio::spawn(async move {
            match coordinator.trigger(&recipe).await {
                Ok(TriggerOutcome::Coalesced) => {
                    debug!(recipe = %recipe, "trigger folded into running recipe");
                    hashes.hold(&recipe, hash_keys);
                }
                Ok(outcome) => {
                    debug!(recipe = %recipe, ?outcome, "trigger handled");
                    hashes.confirm(&recipe);
                }
                Err(err) => {
                    error!(recipe = %recipe, error = %err, "recipe failed");
                    hashes.revert(&recipe, &hash_keys);
                }
            }
        })
    }

    /// Consume events until the channel closes.
    pub async fn run(self, mut rx: mpsc::Receiver<ChangeEvent>) {
        while let Some(event) = rx.recv().await {
            debug!(?event, "received change event");
            self.handle(&event).await;
        }
        debug!("change event channel closed");
    }
}

/// One recipe to trigger, with the content hashes its change recorded.
struct Planned {
    recipe: RecipeName,
    hash_keys: Vec<HashKey>,
}

enum HashState {
    NotNeeded,
    Present(String),
    Gone,
    Unknown,
}

fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        root.join(path)
    } else {
        path.to_path_buf()
    }
}
