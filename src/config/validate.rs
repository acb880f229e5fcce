// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig, TaskKind};
use crate::config::vars::{substitute, substitute_all, substitute_opt};
use crate::errors::{Result, SitewatchError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitewatchError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        expand_vars(&mut raw)?;
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run all semantic checks on an already var-expanded config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task(name, task)?;
    }
    validate_recipes(cfg)?;
    validate_watch_rules(cfg)?;
    validate_startup(cfg)?;
    Ok(())
}

fn expand_vars(raw: &mut RawConfigFile) -> Result<()> {
    let vars = raw.vars.clone();

    for task in raw.task.values_mut() {
        substitute_opt(&mut task.cmd, &vars)?;
        substitute_opt(&mut task.destination, &vars)?;
        substitute_opt(&mut task.source, &vars)?;
        substitute_all(&mut task.watched_paths, &vars)?;
        substitute_all(&mut task.config_files, &vars)?;
        substitute_all(&mut task.roots, &vars)?;

        let mut files = BTreeMap::new();
        for (dest, src) in task.files.iter() {
            files.insert(substitute(dest, &vars)?, substitute(src, &vars)?);
        }
        task.files = files;
    }

    for rule in raw.watch.iter_mut() {
        substitute_all(&mut rule.files, &vars)?;
        substitute_all(&mut rule.exclude, &vars)?;
    }

    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.channel_capacity == 0 {
        return Err(SitewatchError::ConfigError(
            "[config].channel_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task(name: &str, task: &TaskConfig) -> Result<()> {
    // Surfaces a bad `timeout` string.
    task.options()
        .map_err(|e| SitewatchError::ConfigError(format!("task '{name}': {e}")))?;

    match task.kind {
        TaskKind::Command | TaskKind::Generate => {
            let has_cmd = task.cmd.as_deref().is_some_and(|c| !c.trim().is_empty());
            if !has_cmd {
                return Err(SitewatchError::ConfigError(format!(
                    "task '{name}' of kind {:?} requires a non-empty `cmd`",
                    task.kind
                )));
            }
        }
        TaskKind::Markdown => {
            if task.files.is_empty() && task.watched_paths.is_empty() {
                return Err(SitewatchError::ConfigError(format!(
                    "markdown task '{name}' needs `files` or `watched_paths`"
                )));
            }
            if !task.watched_paths.is_empty() && task.destination.is_none() {
                return Err(SitewatchError::ConfigError(format!(
                    "markdown task '{name}' uses `watched_paths` and therefore needs a `destination`"
                )));
            }
        }
        TaskKind::Serve => {
            if task.port == Some(0) {
                return Err(SitewatchError::ConfigError(format!(
                    "serve task '{name}' cannot listen on port 0"
                )));
            }
        }
    }

    Ok(())
}

fn validate_recipes(cfg: &RawConfigFile) -> Result<()> {
    for (recipe, tasks) in cfg.recipe.iter() {
        for task in tasks {
            if !cfg.task.contains_key(task) {
                return Err(SitewatchError::UnknownTask(format!(
                    "{task} (referenced by recipe '{recipe}')"
                )));
            }
        }
    }
    Ok(())
}

fn validate_watch_rules(cfg: &RawConfigFile) -> Result<()> {
    for (idx, rule) in cfg.watch.iter().enumerate() {
        if !cfg.recipe.contains_key(&rule.recipe) {
            return Err(SitewatchError::UnknownRecipe(format!(
                "{} (referenced by [[watch]] #{})",
                rule.recipe,
                idx + 1
            )));
        }
        let has_include = rule.files.iter().any(|p| !p.trim().starts_with('!'));
        if !has_include {
            return Err(SitewatchError::ConfigError(format!(
                "[[watch]] #{} for recipe '{}' has no include patterns",
                idx + 1,
                rule.recipe
            )));
        }
    }
    Ok(())
}

fn validate_startup(cfg: &RawConfigFile) -> Result<()> {
    if let Some(startup) = &cfg.config.startup {
        if !cfg.recipe.contains_key(startup) {
            return Err(SitewatchError::UnknownRecipe(format!(
                "{startup} (referenced by [config].startup)"
            )));
        }
    }
    Ok(())
}
