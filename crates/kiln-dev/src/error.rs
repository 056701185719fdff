//! Error types for the kiln development pipeline.
//!
//! The hierarchy mirrors how failures are handled at runtime:
//! - **`CliError`** is what commands return; everything converts into it via `#[from]`
//! - **`ConfigError`** covers loading and validating `kiln.config.json`
//! - **`WatchError`** disables hot reload but never the render path
//! - **`CompileError`** is handed back to whoever asked the cache for a route
//! - **`StyleError`** aborts the change event that triggered the stylesheet rebuild
//! - **`TransportError`** drops a single browser connection
//!
//! Only `CliError` and `ConfigError` ever reach the user as a failed command.
//! The others are logged where they happen or returned to the immediate caller
//! of a cache lookup.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

mod report;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (file not found, invalid syntax, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Route compilation failed
    #[error("Build error: {0}")]
    Compile(#[from] CompileError),

    /// Global stylesheet rebuild failed
    #[error("Stylesheet error: {0}")]
    Style(#[from] StyleError),

    /// File watching could not be started
    #[error("File watcher error: {0}")]
    Watch(#[from] WatchError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reload server errors
    #[error("Server error: {0}")]
    Server(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file doesn't exist at the expected location
    #[error("Config file not found: {}\n\nHint: Create a kiln.config.json file or pass --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Failure to start or extend filesystem observation.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The frontend root does not exist
    #[error("Watch root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The platform watcher could not be created
    #[error("Failed to start watcher: {0}")]
    Init(#[source] notify::Error),

    /// A directory under the root could not be registered
    #[error("Failed to watch {}: {source}", .path.display())]
    AddDirectory {
        /// Directory that could not be watched
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Walking the root for directories failed
    #[error("Failed to scan {}: {source}", .path.display())]
    Scan {
        /// Root being scanned
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Failure reported by the compile collaborator.
///
/// Cloneable so that every caller waiting on the same in-flight build observes
/// the same failure.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// The bundler reported a diagnostic
    #[error("Failed to compile {}: {message}", .entry.display())]
    Failed {
        /// Route entry file
        entry: PathBuf,
        /// First diagnostic reported by the bundler
        message: String,
    },

    /// The bundler finished but an expected artifact is missing
    #[error("Compiler produced no {artifact} for {}", .entry.display())]
    MissingArtifact {
        /// Route entry file
        entry: PathBuf,
        /// Artifact name, e.g. `server.js`
        artifact: String,
    },

    /// The compiler could not be run at all
    #[error("Failed to run compiler for {}: {source}", .entry.display())]
    Io {
        /// Route entry file
        entry: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl CompileError {
    /// Wrap an I/O failure encountered while compiling `entry`.
    pub fn io(entry: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            entry: entry.into(),
            source: Arc::new(source),
        }
    }
}

/// Failure to rebuild the shared global stylesheet.
#[derive(Debug, Error)]
pub enum StyleError {
    /// The stylesheet command could not be spawned
    #[error("Failed to spawn stylesheet command '{command}': {source}")]
    SpawnFailed {
        /// Program that was spawned
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The stylesheet command exited unsuccessfully
    #[error("Stylesheet command exited with code {exit_code}: {stderr}")]
    ExitStatus {
        /// Process exit code (-1 when killed by a signal)
        exit_code: i32,
        /// Captured standard error
        stderr: String,
    },

    /// The stylesheet command did not finish in time
    #[error("Stylesheet command timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout
        timeout_secs: u64,
    },
}

/// Failure on a single browser reload connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The client closed before completing the handshake
    #[error("Connection closed before handshake")]
    ClosedBeforeHandshake,

    /// Reading from the connection failed
    #[error("Failed to read from connection: {0}")]
    Read(String),

    /// Writing to the connection failed
    #[error("Failed to write to connection: {0}")]
    Write(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Add a file path to the error context.
    ///
    /// I/O `NotFound` errors become [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Add a helpful hint to the error context.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error with a custom message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
