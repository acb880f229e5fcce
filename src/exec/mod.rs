// src/exec/mod.rs

//! Task actions: the opaque units of work recipes are made of.
//!
//! - [`action`] defines the [`TaskAction`] trait the registry stores.
//! - [`command`] runs shell commands via `tokio::process`.
//! - [`markdown`] renders markdown with `pulldown-cmark` ([`Renderer`]).
//! - [`generate`] invokes an external static site generator ([`SiteGenerator`]).
//! - [`serve`] runs a static development server on `tiny_http` ([`FileServer`]).
//! - [`build`] maps `[task.<name>]` config sections onto these adapters.

pub mod action;
pub mod build;
pub mod command;
pub mod generate;
pub mod markdown;
pub mod serve;

pub use action::{action_fn, BoxFuture, FnAction, TaskAction};
pub use build::{build_action, ActionContext};
pub use command::ShellCommand;
pub use generate::{CommandSiteGenerator, GenerateTask, SiteGenerator};
pub use markdown::{CommonMarkRenderer, MarkdownTask, Renderer};
pub use serve::{BrowserOpener, FileServer, ServeTask, StaticFileServer, SystemBrowser};
