// src/config/mod.rs

//! Configuration loading and validation for sitewatch.
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads a config file from disk.
//! - [`validate`] turns a raw file into a checked [`ConfigFile`].
//! - [`vars`] implements `${name}` substitution.

pub mod loader;
pub mod model;
pub mod validate;
pub mod vars;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigFile, ConfigSection, LiveReloadSection, RawConfigFile, TaskConfig, TaskKind,
    WatchConfig,
};
pub use validate::validate_config;
