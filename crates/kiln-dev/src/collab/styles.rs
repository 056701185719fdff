//! Global stylesheet rebuilds.

use crate::collab::StyleBuilder;
use crate::config::StylesheetConfig;
use crate::error::StyleError;
use async_trait::async_trait;
use kiln_graph::normalize_path_from;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

/// Runs a stylesheet command (typically the Tailwind CLI) over the global stylesheet.
///
/// `{input}` and `{output}` in the configured arguments are replaced with the
/// absolute stylesheet source and destination.
#[derive(Debug, Clone)]
pub struct CommandStyleBuilder {
    command: String,
    args: Vec<String>,
    input: PathBuf,
    output: PathBuf,
    root: PathBuf,
    timeout_secs: u64,
}

impl CommandStyleBuilder {
    /// Create a builder for the project at `root`, reading `input`.
    pub fn new(config: &StylesheetConfig, input: &Path, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            input: normalize_path_from(input, &root),
            output: normalize_path_from(&config.output, &root),
            root,
            timeout_secs: config.timeout_secs,
        }
    }

    fn substitute_args(&self) -> Vec<String> {
        let input = self.input.to_string_lossy();
        let output = self.output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl StyleBuilder for CommandStyleBuilder {
    async fn rebuild_global_stylesheet(&self) -> Result<(), StyleError> {
        let args = self.substitute_args();
        tracing::debug!("Rebuilding global stylesheet: {} {}", self.command, args.join(" "));

        let child = Command::new(&self.command)
            .args(&args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| StyleError::SpawnFailed {
                command: self.command.clone(),
                source,
            })?;

        let output = timeout(Duration::from_secs(self.timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| StyleError::Timeout {
                timeout_secs: self.timeout_secs,
            })?
            .map_err(|source| StyleError::SpawnFailed {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(StyleError::ExitStatus {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Used when no stylesheet command is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStyleBuilder;

#[async_trait]
impl StyleBuilder for NoopStyleBuilder {
    async fn rebuild_global_stylesheet(&self) -> Result<(), StyleError> {
        Ok(())
    }
}
