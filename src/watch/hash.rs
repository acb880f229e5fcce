// src/watch/hash.rs

//! Content hashing for `use_hash` watch rules.
//!
//! Editors often touch files without changing them (save without edits,
//! `git checkout` of identical content). Rules with `use_hash = true` only
//! fire when the blake3 hash of the file differs from the last one seen.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the blake3 hash of a single file, as lowercase hex.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// `(rule index, relative path)`.
pub type HashKey = (usize, String);

/// Last seen content hash per `(rule index, relative path)`.
///
/// Keyed per rule so that two hashed rules watching the same file each see
/// the change once. A hash recorded for a change only sticks once the
/// recipe it triggered succeeds; see [`revert`](Self::revert).
#[derive(Debug, Default)]
pub struct ContentHashes {
    seen: Mutex<HashMap<HashKey, String>>,
    /// Keys whose change was folded into a run already in flight, by recipe.
    held: Mutex<HashMap<String, Vec<HashKey>>>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<HashKey, String>> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_held(&self) -> MutexGuard<'_, HashMap<String, Vec<HashKey>>> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the current hash without reporting a change.
    pub fn record(&self, rule: usize, rel_path: &str, hash: String) {
        self.lock().insert((rule, rel_path.to_string()), hash);
    }

    /// Record `hash` (or `None` for a file that is gone) and report whether it
    /// differs from what was last seen. Unknown files count as changed.
    pub fn update(&self, rule: usize, rel_path: &str, hash: Option<String>) -> bool {
        let key = (rule, rel_path.to_string());
        let mut seen = self.lock();

        match hash {
            Some(hash) => {
                let changed = seen.get(&key) != Some(&hash);
                if !changed {
                    debug!(rule, path = %rel_path, "content unchanged");
                }
                seen.insert(key, hash);
                changed
            }
            None => {
                seen.remove(&key);
                true
            }
        }
    }

    /// Drop the stored hash, so the next event for the file counts as a change.
    pub fn forget(&self, rule: usize, rel_path: &str) {
        self.lock().remove(&(rule, rel_path.to_string()));
    }

    /// Park keys whose trigger coalesced into an in-flight run of `recipe`.
    pub fn hold(&self, recipe: &str, keys: Vec<HashKey>) {
        if keys.is_empty() {
            return;
        }
        self.lock_held()
            .entry(recipe.to_string())
            .or_default()
            .extend(keys);
    }

    /// `recipe` succeeded: parked keys keep their hashes.
    pub fn confirm(&self, recipe: &str) {
        self.lock_held().remove(recipe);
    }

    /// `recipe` failed: forget `keys` and every key parked for it, so saving
    /// the same content again retries the recipe.
    pub fn revert(&self, recipe: &str, keys: &[HashKey]) {
        let parked = self.lock_held().remove(recipe).unwrap_or_default();
        let mut seen = self.lock();
        for key in keys.iter().chain(parked.iter()) {
            seen.remove(key);
        }
        debug!(recipe, forgotten = keys.len() + parked.len(), "recipe failed; content hashes dropped");
    }

    pub fn get(&self, rule: usize, rel_path: &str) -> Option<String> {
        self.lock().get(&(rule, rel_path.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
