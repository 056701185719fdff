//! Configuration system for kiln with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and config files.
//! Priority: CLI > Environment > File > Defaults

mod defaults;
mod loading;
mod validation;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use defaults::*;
pub use loading::ConfigOverrides;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "kiln.config.json";

/// Kiln configuration - loaded from kiln.config.json, `KILN_*` or CLI args.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KilnConfig {
    /// Root of the frontend source tree that is watched for changes
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: PathBuf,

    /// Shared layout template; changing it reloads every route
    #[serde(default = "default_layout_file")]
    pub layout_file: PathBuf,

    /// Global stylesheet rebuilt by the stylesheet command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_css_file: Option<PathBuf>,

    /// Utility-style (Tailwind) config; when set, component edits also rebuild the global stylesheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tailwind_config: Option<PathBuf>,

    /// Port of the reload websocket server
    #[serde(default = "default_hot_reload_port")]
    pub hot_reload_port: u16,

    /// Report a changed file once it has been quiet this long (0 disables)
    #[serde(default)]
    pub debounce_ms: u64,

    /// External bundler invocation
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// External global stylesheet build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<StylesheetConfig>,

    /// Working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

/// How to invoke the external bundler for one route.
///
/// `{entry}` and `{outdir}` in `args` are substituted per build. The command
/// must write `server.js`, `client.js`, an optional `client.css` and an
/// esbuild-style `meta.json` into `{outdir}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompilerConfig {
    /// Program to run
    #[serde(default = "default_compiler_command")]
    pub command: String,

    /// Arguments, with `{entry}` / `{outdir}` placeholders
    #[serde(default = "default_compiler_args")]
    pub args: Vec<String>,

    /// Scratch directory for per-route build output
    #[serde(default = "default_compiler_out_dir")]
    pub out_dir: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: default_compiler_command(),
            args: default_compiler_args(),
            out_dir: default_compiler_out_dir(),
        }
    }
}

/// How to rebuild the global stylesheet.
///
/// `{input}` is replaced with `globalCssFile` and `{output}` with `output`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StylesheetConfig {
    /// Program to run, e.g. `npx`
    pub command: String,

    /// Arguments, with `{input}` / `{output}` placeholders
    #[serde(default)]
    pub args: Vec<String>,

    /// Where the built stylesheet is written
    #[serde(default = "default_stylesheet_output")]
    pub output: PathBuf,

    /// Kill the command after this many seconds
    #[serde(default = "default_stylesheet_timeout_secs")]
    pub timeout_secs: u64,
}
