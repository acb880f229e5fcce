// src/exec/markdown.rs

//! `kind = "markdown"`: render markdown sources to HTML fragments.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use pulldown_cmark::{html, Options, Parser};
use tracing::{debug, info};

use crate::exec::action::{BoxFuture, TaskAction};
use crate::fs::{walk_files, FileSystem};
use crate::watch::path_utils::to_slash;
use crate::watch::patterns::PatternSet;

/// Markdown to HTML conversion.
pub trait Renderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark plus the usual GitHub extensions, via `pulldown-cmark`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

impl Renderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        let parser = Parser::new_ext(markdown, options);

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Renders an explicit `output -> source` map plus, optionally, every file
/// matching `sources` into `destination/<stem>.html`.
#[derive(Clone)]
pub struct MarkdownTask {
    renderer: Arc<dyn Renderer>,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    /// (output, source), relative to `root`.
    files: Vec<(PathBuf, PathBuf)>,
    sources: Option<(PatternSet, PathBuf)>,
}

impl MarkdownTask {
    pub fn new(renderer: Arc<dyn Renderer>, fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            fs,
            root: root.into(),
            files: Vec::new(),
            sources: None,
        }
    }

    pub fn with_file(mut self, output: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        self.files.push((output.into(), source.into()));
        self
    }

    pub fn with_sources(mut self, patterns: PatternSet, destination: impl Into<PathBuf>) -> Self {
        self.sources = Some((patterns, destination.into()));
        self
    }

    /// Absolute `(source, output)` pairs this task would render right now.
    pub fn plan(&self) -> Result<Vec<(PathBuf, PathBuf)>> {
        let mut jobs: Vec<(PathBuf, PathBuf)> = self
            .files
            .iter()
            .map(|(out, src)| (self.root.join(src), self.root.join(out)))
            .collect();

        if let Some((patterns, destination)) = &self.sources {
            for path in walk_files(self.fs.as_ref(), &self.root)? {
                let Ok(rel) = path.strip_prefix(&self.root) else {
                    continue;
                };
                if !patterns.matches(&to_slash(rel)) {
                    continue;
                }
                let Some(stem) = path.file_stem() else {
                    continue;
                };
                let output = self
                    .root
                    .join(destination)
                    .join(format!("{}.html", stem.to_string_lossy()));
                jobs.push((path, output));
            }
        }

        Ok(jobs)
    }

    /// Render every planned file; returns how many were written.
    pub fn render_all(&self) -> Result<usize> {
        let jobs = self.plan()?;

        for (source, output) in &jobs {
            self.render_one(source, output)?;
        }

        info!(rendered = jobs.len(), "markdown rendered");
        Ok(jobs.len())
    }

    fn render_one(&self, source: &Path, output: &Path) -> Result<()> {
        let markdown = self
            .fs
            .read_to_string(source)
            .with_context(|| format!("reading markdown source {:?}", source))?;
        let html = self.renderer.render(&markdown);
        self.fs
            .write(output, html.as_bytes())
            .with_context(|| format!("writing rendered HTML {:?}", output))?;
        debug!(?source, ?output, "rendered markdown file");
        Ok(())
    }
}

impl TaskAction for MarkdownTask {
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        let this = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || this.render_all())
                .await
                .context("markdown render worker panicked")??;
            Ok(())
        })
    }

    fn describe(&self) -> String {
        let globs = self
            .sources
            .as_ref()
            .map(|(p, _)| p.include_patterns().len())
            .unwrap_or(0);
        format!("markdown: {} file(s), {} glob(s)", self.files.len(), globs)
    }
}
