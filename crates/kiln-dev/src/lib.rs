//! kiln - development pipeline for server-rendered React pages.
//!
//! Route entry files are compiled on demand and cached together with the set
//! of source files each build read. A file watcher classifies every change,
//! evicts exactly the builds it makes stale, and tells only the browsers
//! viewing those routes to reload.
//!
//! # Architecture
//!
//! - [`dev`] - Build cache, watcher, change classification and reload broadcast
//! - [`collab`] - Seams to the external compiler and stylesheet commands
//! - [`config`] - `kiln.config.json` loading and validation
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status output
//! - `cli` and `commands` - The `kiln` binary
//!
//! The dependency graph itself lives in the `kiln-graph` crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_dev::config::KilnConfig;
//! use kiln_dev::dev::{DevConfig, HotReloadEngine};
//! use std::path::Path;
//!
//! # async fn run(config: KilnConfig) -> kiln_dev::Result<()> {
//! let engine = HotReloadEngine::with_commands(DevConfig::from_config(&config, Path::new(".")));
//! let build = engine.build_route(Path::new("frontend/Home.tsx"), "{}").await?;
//! println!("{} bytes of server code", build.server_code.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod collab;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
