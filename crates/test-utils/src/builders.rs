#![allow(dead_code)]

use std::collections::BTreeMap;

use sitewatch::config::{
    ConfigFile, ConfigSection, LiveReloadSection, RawConfigFile, TaskConfig, TaskKind, WatchConfig,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                vars: BTreeMap::new(),
                livereload: LiveReloadSection {
                    enabled: false,
                    ..LiveReloadSection::default()
                },
                task: BTreeMap::new(),
                recipe: BTreeMap::new(),
                watch: Vec::new(),
            },
        }
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.config.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_recipe(mut self, name: &str, tasks: &[&str]) -> Self {
        self.config
            .recipe
            .insert(name.to_string(), tasks.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_watch(mut self, files: &[&str], recipe: &str) -> Self {
        self.config.watch.push(WatchConfig {
            files: files.iter().map(|f| f.to_string()).collect(),
            exclude: Vec::new(),
            recipe: recipe.to_string(),
            use_hash: false,
        });
        self
    }

    pub fn with_hashed_watch(mut self, files: &[&str], recipe: &str) -> Self {
        self = self.with_watch(files, recipe);
        if let Some(rule) = self.config.watch.last_mut() {
            rule.use_hash = true;
        }
        self
    }

    pub fn startup(mut self, recipe: &str) -> Self {
        self.config.config.startup = Some(recipe.to_string());
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            task: TaskConfig::of_kind(kind),
        }
    }

    /// `kind = "command"` running `cmd`.
    pub fn command(cmd: &str) -> Self {
        Self::new(TaskKind::Command).cmd(cmd)
    }

    pub fn markdown() -> Self {
        Self::new(TaskKind::Markdown)
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.task.cmd = Some(cmd.to_string());
        self
    }

    pub fn file(mut self, output: &str, source: &str) -> Self {
        self.task.files.insert(output.to_string(), source.to_string());
        self
    }

    pub fn watched_path(mut self, pattern: &str) -> Self {
        self.task.watched_paths.push(pattern.to_string());
        self
    }

    pub fn destination(mut self, dest: &str) -> Self {
        self.task.destination = Some(dest.to_string());
        self
    }

    pub fn source(mut self, src: &str) -> Self {
        self.task.source = Some(src.to_string());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.task.port = Some(port);
        self
    }

    pub fn root(mut self, root: &str) -> Self {
        self.task.roots.push(root.to_string());
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.task.timeout = Some(timeout.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
