//! External collaborators of the dev pipeline.
//!
//! The cache never compiles anything itself. It asks a [`Compiler`] for a
//! route's artifacts and, when styles are affected, a [`StyleBuilder`] to
//! refresh the shared global stylesheet. The `kiln` binary plugs in the
//! command-backed implementations; tests plug in in-memory fakes.

mod command;
mod styles;

pub use command::{CommandCompiler, TEMP_FILE_MARKER, renderer_path};
pub use styles::{CommandStyleBuilder, NoopStyleBuilder};

use crate::error::{CompileError, StyleError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Artifacts produced by one compile of a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    /// Bundle evaluated on the server to render HTML
    pub server_code: String,
    /// Bundle shipped to the browser for hydration
    pub client_code: String,
    /// Stylesheet extracted from the route's imports (may be empty)
    pub css: String,
    /// Every source file the bundler read while compiling the route
    pub dependency_files: Vec<PathBuf>,
}

/// Turns a route entry file into server and client bundles.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile `entry` with `props` (a JSON object) inlined into the client bundle.
    async fn compile(&self, entry: &Path, props: &str) -> Result<CompileOutput, CompileError>;
}

/// Rebuilds the stylesheet shared by every route.
#[async_trait]
pub trait StyleBuilder: Send + Sync {
    async fn rebuild_global_stylesheet(&self) -> Result<(), StyleError>;
}
