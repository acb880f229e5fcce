// src/watch/patterns.rs

//! Glob matching and the watch rule engine.
//!
//! Paths are `/`-separated and relative to the project root. Pattern rules:
//!
//! - `*` stays within one segment, `**` crosses segments, `{a,b}` alternates.
//! - A leading `!` marks an exclusion; exclusion always wins within a rule.
//! - A leading `./` is ignored; a leading `/` anchors the pattern at the root.
//! - Unanchored patterns float: they may match starting at any segment, so
//!   `*.md` matches `app/bmi.md` and `vendor/**` matches `app/vendor/x.md`.
//! - A pattern naming a directory also covers everything below it, so
//!   `!./vendor` excludes `vendor/readme.md`.

use std::fmt;
use std::sync::Arc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{Result, SitewatchError};
use crate::registry::TaskRegistry;
use crate::types::RecipeName;
use crate::watch::path_utils::normalize_rel;

/// Compiled include/exclude glob pair.
#[derive(Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: Option<GlobSet>,
    include_src: Vec<String>,
    exclude_src: Vec<String>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("include", &self.include_src)
            .field("exclude", &self.exclude_src)
            .finish()
    }
}

impl PatternSet {
    /// Compile `patterns` (where `!`-prefixed entries are exclusions) plus an
    /// explicit exclusion list.
    pub fn new(patterns: &[String], exclude: &[String]) -> Result<Self> {
        let mut include_src = Vec::new();
        let mut exclude_src: Vec<String> = Vec::new();

        for pat in patterns {
            match pat.trim().strip_prefix('!') {
                Some(negated) => exclude_src.push(negated.to_string()),
                None => include_src.push(pat.trim().to_string()),
            }
        }
        exclude_src.extend(exclude.iter().map(|p| p.trim().to_string()));

        let include = build_globset(&include_src)?;
        let exclude = if exclude_src.is_empty() {
            None
        } else {
            Some(build_globset(&exclude_src)?)
        };

        Ok(Self {
            include,
            exclude,
            include_src,
            exclude_src,
        })
    }

    /// True if `rel_path` is included and not excluded.
    pub fn matches(&self, rel_path: &str) -> bool {
        let rel = normalize_rel(rel_path);
        if !self.include.is_match(rel.as_str()) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel.as_str()) {
                return false;
            }
        }
        true
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include_src
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_src
    }
}

/// Expand one user pattern into the globs that implement the rules above.
pub fn expand_pattern(pattern: &str) -> Vec<String> {
    let mut pat = pattern.trim();
    while let Some(rest) = pat.strip_prefix("./") {
        pat = rest;
    }

    let (base, anchored) = match pat.strip_prefix('/') {
        Some(rest) => (rest.trim_end_matches('/'), true),
        None => (pat.trim_end_matches('/'), false),
    };

    if base.is_empty() || base == "**" || base == "." {
        return vec!["**".to_string()];
    }

    let mut roots = vec![base.to_string()];
    if !anchored && !base.starts_with("**/") {
        roots.push(format!("**/{base}"));
    }

    let mut out = Vec::with_capacity(roots.len() * 2);
    for root in roots {
        let covers_subtree = root.ends_with("/**");
        out.push(root.clone());
        if !covers_subtree {
            out.push(format!("{root}/**"));
        }
    }
    out
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        for expanded in expand_pattern(pat) {
            let glob = GlobBuilder::new(&expanded)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    SitewatchError::ConfigError(format!("invalid glob pattern '{pat}': {e}"))
                })?;
            builder.add(glob);
        }
    }
    builder
        .build()
        .map_err(|e| SitewatchError::ConfigError(format!("building glob set: {e}")))
}

/// A compiled watch rule: which paths trigger which recipe.
#[derive(Debug, Clone)]
pub struct WatchRule {
    recipe: RecipeName,
    patterns: PatternSet,
    use_hash: bool,
}

impl WatchRule {
    pub fn recipe(&self) -> &str {
        &self.recipe
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Whether content-identical changes should be ignored.
    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.matches(rel_path)
    }
}

/// Maps changed paths to the recipes that must re-run.
#[derive(Debug)]
pub struct WatchRuleEngine {
    registry: Arc<TaskRegistry>,
    rules: Vec<WatchRule>,
}

impl WatchRuleEngine {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self {
            registry,
            rules: Vec::new(),
        }
    }

    /// Build an engine holding every `[[watch]]` rule of the config.
    pub fn from_config(cfg: &ConfigFile, registry: Arc<TaskRegistry>) -> Result<Self> {
        let mut engine = Self::new(registry);
        for rule in cfg.watch_rules() {
            engine.push_rule(&rule.files, &rule.exclude, &rule.recipe, rule.use_hash)?;
        }
        Ok(engine)
    }

    /// Register a rule. Fails with `UnknownRecipe` if the registry has no
    /// such recipe, and with a config error for invalid globs.
    pub fn add_rule<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        exclude_patterns: &[S],
        recipe: &str,
    ) -> Result<()> {
        let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        let exclude: Vec<String> = exclude_patterns
            .iter()
            .map(|p| p.as_ref().to_string())
            .collect();
        self.push_rule(&patterns, &exclude, recipe, false)
    }

    /// Like [`add_rule`](Self::add_rule), but changes that leave the file
    /// content unchanged are ignored for this rule.
    pub fn add_hashed_rule<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        exclude_patterns: &[S],
        recipe: &str,
    ) -> Result<()> {
        self.add_rule(patterns, exclude_patterns, recipe)?;
        if let Some(rule) = self.rules.last_mut() {
            rule.use_hash = true;
        }
        Ok(())
    }

    fn push_rule(
        &mut self,
        patterns: &[String],
        exclude: &[String],
        recipe: &str,
        use_hash: bool,
    ) -> Result<()> {
        if !self.registry.has_recipe(recipe) {
            return Err(SitewatchError::UnknownRecipe(recipe.to_string()));
        }

        let patterns = PatternSet::new(patterns, exclude)?;
        debug!(recipe = %recipe, ?patterns, use_hash, "registered watch rule");

        self.rules.push(WatchRule {
            recipe: recipe.to_string(),
            patterns,
            use_hash,
        });
        Ok(())
    }

    /// Recipe names triggered by a change to `rel_path`, in rule
    /// registration order and without duplicates.
    pub fn match_path(&self, rel_path: &str) -> Vec<RecipeName> {
        let mut recipes: Vec<RecipeName> = Vec::new();
        for rule in self.matching_rules(rel_path) {
            if !recipes.iter().any(|r| r == rule.recipe()) {
                recipes.push(rule.recipe.clone());
            }
        }
        recipes
    }

    /// Every rule matching `rel_path`, in registration order.
    pub fn matching_rules<'a>(
        &'a self,
        rel_path: &'a str,
    ) -> impl Iterator<Item = &'a WatchRule> + 'a {
        self.rules.iter().filter(move |rule| rule.matches(rel_path))
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }
}
