// src/exec/build.rs

//! Turn `[task.<name>]` sections into concrete actions.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::model::{TaskConfig, TaskKind};
use crate::errors::{Result, SitewatchError};
use crate::exec::action::TaskAction;
use crate::exec::command::ShellCommand;
use crate::exec::generate::{CommandSiteGenerator, GenerateTask};
use crate::exec::markdown::{CommonMarkRenderer, MarkdownTask};
use crate::exec::serve::{BrowserOpener, ServeTask, StaticFileServer, SystemBrowser};
use crate::fs::FileSystem;
use crate::watch::patterns::PatternSet;

/// Everything an adapter needs besides its own config section.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Project root; relative paths in the config are resolved against it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    /// When set, served HTML pages connect to the live-reload socket.
    pub livereload_port: Option<u16>,
}

pub fn build_action(name: &str, task: &TaskConfig, ctx: &ActionContext) -> Result<Arc<dyn TaskAction>> {
    let action: Arc<dyn TaskAction> = match task.kind {
        TaskKind::Markdown => {
            let mut md = MarkdownTask::new(
                Arc::new(CommonMarkRenderer),
                Arc::clone(&ctx.fs),
                ctx.root.clone(),
            );
            for (output, source) in task.files.iter() {
                md = md.with_file(output, source);
            }
            if !task.watched_paths.is_empty() {
                let destination = task.destination.clone().ok_or_else(|| {
                    SitewatchError::ConfigError(format!(
                        "markdown task '{name}' needs a `destination` for `watched_paths`"
                    ))
                })?;
                let patterns = PatternSet::new(&task.watched_paths, &[])?;
                md = md.with_sources(patterns, destination);
            }
            Arc::new(md)
        }
        TaskKind::Generate => {
            let generator = CommandSiteGenerator::new(name, required_cmd(name, task)?, ctx.root.clone())
                .with_source(task.source.clone())
                .with_destination(task.destination.clone())
                .with_config_files(task.config_files.clone());
            Arc::new(GenerateTask::new(Arc::new(generator)))
        }
        TaskKind::Serve => {
            let roots: Vec<PathBuf> = if task.roots.is_empty() {
                vec![ctx.root.clone()]
            } else {
                task.roots.iter().map(|r| ctx.root.join(r)).collect()
            };
            let hostname = task.hostname.clone().unwrap_or_else(|| "localhost".to_string());
            let server = StaticFileServer::new(hostname, task.effective_port(), roots)
                .with_livereload(ctx.livereload_port);
            let browser = task
                .open
                .then(|| Arc::new(SystemBrowser) as Arc<dyn BrowserOpener>);
            Arc::new(ServeTask::new(Arc::new(server)).with_browser(browser))
        }
        TaskKind::Command => Arc::new(ShellCommand::new(
            name,
            required_cmd(name, task)?,
            ctx.root.clone(),
        )),
    };

    Ok(action)
}

fn required_cmd(name: &str, task: &TaskConfig) -> Result<String> {
    task.cmd
        .clone()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| SitewatchError::ConfigError(format!("task '{name}' requires a `cmd`")))
}
