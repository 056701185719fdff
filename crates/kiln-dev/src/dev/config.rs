//! Development pipeline configuration.
//!
//! Resolves a loaded [`KilnConfig`] against the project root so every path
//! the engine compares against watcher events is absolute and normalized.

use crate::config::{CompilerConfig, KilnConfig, StylesheetConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Runtime configuration of the hot reload engine.
#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Project root every relative path was resolved against
    pub root: PathBuf,

    /// Watched frontend tree
    pub frontend_dir: PathBuf,

    /// Shared layout template
    pub layout_file: PathBuf,

    /// Global stylesheet source
    pub global_css_file: Option<PathBuf>,

    /// Utility-CSS config; enables style rebuilds on script changes
    pub tailwind_config: Option<PathBuf>,

    /// Port of the reload websocket server
    pub hot_reload_port: u16,

    /// Quiet window per path before a change is reported, in milliseconds (0 disables)
    pub debounce_ms: u64,

    /// Bundler invocation
    pub compiler: CompilerConfig,

    /// Stylesheet build, if configured
    pub stylesheet: Option<StylesheetConfig>,
}

impl DevConfig {
    /// Resolve `config` against `base`, honouring its `cwd` setting.
    pub fn from_config(config: &KilnConfig, base: &Path) -> Self {
        let root = config.project_root(base);
        let resolve = |path: &Path| config.resolve(&root, path);

        Self {
            frontend_dir: resolve(&config.frontend_dir),
            layout_file: resolve(&config.layout_file),
            global_css_file: config.global_css_file.as_deref().map(resolve),
            tailwind_config: config.tailwind_config.as_deref().map(resolve),
            hot_reload_port: config.hot_reload_port,
            debounce_ms: config.debounce_ms,
            compiler: config.compiler.clone(),
            stylesheet: config.stylesheet.clone(),
            root,
        }
    }

    /// Address the reload server binds to.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.hot_reload_port))
    }

    /// Websocket URL handed to browser clients.
    pub fn reload_url(&self) -> String {
        format!("ws://localhost:{}/ws", self.hot_reload_port)
    }
}
