// src/errors.rs

//! Crate-wide error type and aliases.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitewatchError {
    #[error("Duplicate task: {0}")]
    DuplicateTask(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Unknown recipe: {0}")]
    UnknownRecipe(String),

    /// A task inside a recipe failed (or timed out). Remaining tasks of that
    /// run were skipped.
    #[error("recipe '{recipe}' failed at task '{task}': {reason}")]
    RecipeExecution {
        recipe: String,
        task: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitewatchError {
    /// True for errors that must abort startup.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SitewatchError::DuplicateTask(_)
                | SitewatchError::UnknownTask(_)
                | SitewatchError::UnknownRecipe(_)
                | SitewatchError::ConfigError(_)
                | SitewatchError::TomlError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitewatchError>;
