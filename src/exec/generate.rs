// src/exec/generate.rs

//! `kind = "generate"`: regenerate the static site with an external generator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::exec::action::{BoxFuture, TaskAction};
use crate::exec::command::{run_shell, shell_quote};

/// A static site generator invocation.
pub trait SiteGenerator: Send + Sync {
    fn generate(&self) -> BoxFuture<'_, Result<()>>;

    fn describe(&self) -> String;
}

/// Runs a Jekyll-style command line:
/// `<program> [--source S] [--destination D] [--config a,b]`.
#[derive(Debug, Clone)]
pub struct CommandSiteGenerator {
    label: String,
    program: String,
    source: Option<String>,
    destination: Option<String>,
    config_files: Vec<String>,
    cwd: PathBuf,
}

impl CommandSiteGenerator {
    pub fn new(label: impl Into<String>, program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            source: None,
            destination: None,
            config_files: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn with_destination(mut self, destination: Option<String>) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_config_files(mut self, config_files: Vec<String>) -> Self {
        self.config_files = config_files;
        self
    }

    /// The full shell command line that will be executed.
    pub fn command_line(&self) -> String {
        let mut line = self.program.trim().to_string();
        if let Some(source) = &self.source {
            line.push_str(" --source ");
            line.push_str(&shell_quote(source));
        }
        if let Some(destination) = &self.destination {
            line.push_str(" --destination ");
            line.push_str(&shell_quote(destination));
        }
        if !self.config_files.is_empty() {
            line.push_str(" --config ");
            line.push_str(&shell_quote(&self.config_files.join(",")));
        }
        line
    }
}

impl SiteGenerator for CommandSiteGenerator {
    fn generate(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let line = self.command_line();
            run_shell(&self.label, &line, &self.cwd).await
        })
    }

    fn describe(&self) -> String {
        self.command_line()
    }
}

/// Task action delegating to a [`SiteGenerator`].
pub struct GenerateTask {
    generator: Arc<dyn SiteGenerator>,
}

impl GenerateTask {
    pub fn new(generator: Arc<dyn SiteGenerator>) -> Self {
        Self { generator }
    }
}

impl TaskAction for GenerateTask {
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        self.generator.generate()
    }

    fn describe(&self) -> String {
        format!("generate: {}", self.generator.describe())
    }
}
