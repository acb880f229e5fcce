// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::{Result, SitewatchError};
use crate::registry::TaskOptions;
use crate::types::parse_duration;

/// Default LiveReload port, the one browser extensions expect.
pub const DEFAULT_LIVERELOAD_PORT: u16 = 35729;

/// Default port for `kind = "serve"` tasks.
pub const DEFAULT_SERVE_PORT: u16 = 9000;

/// Configuration exactly as deserialized from `Sitewatch.toml`.
///
/// ```toml
/// [config]
/// startup = "serve"
///
/// [vars]
/// app = "app"
///
/// [task.markdown]
/// kind = "markdown"
/// files = { "public/bmi.html" = "${app}/bmi.md" }
///
/// [recipe]
/// serve = ["markdown"]
///
/// [[watch]]
/// files = ["${app}/**/*.md", "!./vendor"]
/// recipe = "serve"
/// ```
///
/// No semantic checks have been applied; convert into [`ConfigFile`] for that.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// `${name}` substitutions applied to every path-like string.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    #[serde(default)]
    pub livereload: LiveReloadSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Recipe name -> ordered task names.
    #[serde(default)]
    pub recipe: BTreeMap<String, Vec<String>>,

    /// `[[watch]]` rules, in declaration order.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Recipe to run once at startup (before watching starts).
    #[serde(default)]
    pub startup: Option<String>,

    /// Capacity of the change-event channel between watcher and dispatcher.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            startup: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// `[livereload]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveReloadSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_livereload_port")]
    pub port: u16,

    #[serde(default = "default_hostname")]
    pub hostname: String,
}

fn default_true() -> bool {
    true
}

fn default_livereload_port() -> u16 {
    DEFAULT_LIVERELOAD_PORT
}

fn default_hostname() -> String {
    "localhost".to_string()
}

impl Default for LiveReloadSection {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_LIVERELOAD_PORT,
            hostname: default_hostname(),
        }
    }
}

/// Which adapter a task delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Render markdown files to HTML.
    Markdown,
    /// Invoke a static site generator.
    Generate,
    /// Serve directories over HTTP (started once, keeps running).
    Serve,
    /// Run an arbitrary shell command.
    Command,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub kind: TaskKind,

    /// Shell command (`command`) or generator program (`generate`).
    #[serde(default)]
    pub cmd: Option<String>,

    /// Markdown: output path -> source path.
    #[serde(default)]
    pub files: BTreeMap<String, String>,

    /// Glob list of inputs. Markdown renders every match into `destination`.
    #[serde(default)]
    pub watched_paths: Vec<String>,

    /// Output path (markdown output dir, generator destination).
    #[serde(default)]
    pub destination: Option<String>,

    /// Generator source directory.
    #[serde(default)]
    pub source: Option<String>,

    /// Generator config files, passed as a comma separated `--config`.
    #[serde(default)]
    pub config_files: Vec<String>,

    /// Serve: interface to bind.
    #[serde(default)]
    pub hostname: Option<String>,

    /// Serve: listen port.
    #[serde(default)]
    pub port: Option<u16>,

    /// Serve: directories searched in order for each request.
    #[serde(default)]
    pub roots: Vec<String>,

    /// Serve: open the site in a browser once the server is up.
    #[serde(default)]
    pub open: bool,

    /// Duration string (e.g. `"30s"`); a run exceeding it fails.
    #[serde(default)]
    pub timeout: Option<String>,
}

impl TaskConfig {
    /// A task of the given kind with every option unset.
    pub fn of_kind(kind: TaskKind) -> Self {
        Self {
            kind,
            cmd: None,
            files: BTreeMap::new(),
            watched_paths: Vec::new(),
            destination: None,
            source: None,
            config_files: Vec::new(),
            hostname: None,
            port: None,
            roots: Vec::new(),
            open: false,
            timeout: None,
        }
    }

    /// Options shared by every task kind.
    pub fn options(&self) -> Result<TaskOptions> {
        let timeout = match &self.timeout {
            Some(s) => Some(parse_duration(s).map_err(SitewatchError::ConfigError)?),
            None => None,
        };

        Ok(TaskOptions {
            destination: self.destination.as_ref().map(PathBuf::from),
            port: self.port,
            watched_paths: self.watched_paths.clone(),
            timeout,
        })
    }

    /// Effective port for `serve` tasks.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SERVE_PORT)
    }
}

/// `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Glob patterns; entries starting with `!` are exclusions.
    pub files: Vec<String>,

    /// Extra exclusions, equivalent to `!`-prefixed `files` entries.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Recipe triggered when a matching path changes.
    pub recipe: String,

    /// Ignore changes that leave the file content identical.
    #[serde(default)]
    pub use_hash: bool,
}

/// Validated configuration. Construct with `ConfigFile::try_from(raw)`.
///
/// `${var}` references have already been substituted, every recipe refers
/// only to declared tasks and every watch rule to a declared recipe.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub livereload: LiveReloadSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub recipe: BTreeMap<String, Vec<String>>,
    pub watch: Vec<WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            livereload: raw.livereload,
            task: raw.task,
            recipe: raw.recipe,
            watch: raw.watch,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn recipes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.recipe
    }

    pub fn watch_rules(&self) -> &[WatchConfig] {
        &self.watch
    }
}
