//! Scriptable task actions and reload channels for driving the coordinator
//! without spawning processes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitewatch::exec::{BoxFuture, TaskAction};
use sitewatch::reload::ReloadChannel;
use tokio::sync::{watch, Notify};

/// Shared, ordered record of which actions ran.
#[derive(Debug, Clone, Default)]
pub struct ActionLog(Arc<Mutex<Vec<String>>>);

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: &str) {
        self.0.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Appends its label to the log and succeeds.
#[derive(Debug)]
pub struct RecordingAction {
    label: String,
    log: ActionLog,
}

impl RecordingAction {
    pub fn new(label: &str, log: &ActionLog) -> Arc<dyn TaskAction> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
        })
    }
}

impl TaskAction for RecordingAction {
    fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push(&self.label);
            Ok(())
        })
    }

    fn describe(&self) -> String {
        format!("record {}", self.label)
    }
}

/// Appends its label to the log, then fails.
#[derive(Debug)]
pub struct FailingAction {
    label: String,
    log: ActionLog,
}

impl FailingAction {
    pub fn new(label: &str, log: &ActionLog) -> Arc<dyn TaskAction> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
        })
    }
}

impl TaskAction for FailingAction {
    fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push(&self.label);
            anyhow::bail!("{} exploded", self.label)
        })
    }

    fn describe(&self) -> String {
        format!("fail {}", self.label)
    }
}

/// Sleeps, then appends its label.
#[derive(Debug)]
pub struct SleepAction {
    label: String,
    log: ActionLog,
    delay: Duration,
}

impl SleepAction {
    pub fn new(label: &str, log: &ActionLog, delay: Duration) -> Arc<dyn TaskAction> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
            delay,
        })
    }
}

impl TaskAction for SleepAction {
    fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.log.push(&self.label);
            Ok(())
        })
    }

    fn describe(&self) -> String {
        format!("sleep {:?} then record {}", self.delay, self.label)
    }
}

/// Controls a [`GatedAction`] from the test body.
#[derive(Debug, Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
    started: Arc<Notify>,
    starts: Arc<AtomicUsize>,
}

impl Gate {
    /// Let every current and future run through.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    /// Wait until a run has entered the action.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

/// Records its label, then blocks until the [`Gate`] opens.
#[derive(Debug)]
pub struct GatedAction {
    label: String,
    log: ActionLog,
    rx: watch::Receiver<bool>,
    started: Arc<Notify>,
    starts: Arc<AtomicUsize>,
}

impl GatedAction {
    pub fn new(label: &str, log: &ActionLog) -> (Arc<dyn TaskAction>, Gate) {
        let (tx, rx) = watch::channel(false);
        let started = Arc::new(Notify::new());
        let starts = Arc::new(AtomicUsize::new(0));
        let action = Self {
            label: label.to_string(),
            log: log.clone(),
            rx,
            started: Arc::clone(&started),
            starts: Arc::clone(&starts),
        };
        let gate = Gate {
            tx: Arc::new(tx),
            started,
            starts,
        };
        (Arc::new(action), gate)
    }
}

impl TaskAction for GatedAction {
    fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push(&self.label);
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();

            let mut rx = self.rx.clone();
            rx.wait_for(|open| *open).await?;
            Ok(())
        })
    }

    fn describe(&self) -> String {
        format!("gated {}", self.label)
    }
}

/// Reload channel that remembers every completion, in order.
#[derive(Debug, Default)]
pub struct RecordingReload {
    completed: Mutex<Vec<String>>,
}

impl RecordingReload {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn count_for(&self, recipe: &str) -> usize {
        self.completed
            .lock()
            .unwrap()
            .iter()
            .filter(|r| *r == recipe)
            .count()
    }
}

impl ReloadChannel for RecordingReload {
    fn recipe_completed(&self, recipe: &str) {
        self.completed.lock().unwrap().push(recipe.to_string());
    }
}
