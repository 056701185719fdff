//! Route compilation through an external bundler command.
//!
//! For each build a small renderer entry is written next to the route. It
//! imports the route component and hydrates it with the request props. The
//! configured command bundles that entry into `{outdir}` and reports its
//! inputs in an esbuild-style metafile.
//!
//! Two builds of one route may overlap when a route is invalidated mid-build
//! and requested again, so every attempt gets its own renderer file and
//! output directory.

use crate::collab::{CompileOutput, Compiler};
use crate::config::CompilerConfig;
use crate::error::CompileError;
use async_trait::async_trait;
use kiln_graph::normalize_path_from;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;

/// Marker in the file name of generated renderer entries.
///
/// The watcher ignores any path containing it, so writing and deleting the
/// renderer never triggers a reload.
pub const TEMP_FILE_MARKER: &str = "-kiln-temporary";

const SERVER_ARTIFACT: &str = "server.js";
const CLIENT_ARTIFACT: &str = "client.js";
const CSS_ARTIFACT: &str = "client.css";
const META_ARTIFACT: &str = "meta.json";

/// Path of the temporary renderer entry for one build attempt of `route`:
/// `Home.tsx`, attempt 3 -> `Home-kiln-temporary-3.tsx`.
pub fn renderer_path(route: &Path, attempt: u64) -> PathBuf {
    let stem = route
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match route.extension() {
        Some(ext) => format!(
            "{}{}-{}.{}",
            stem,
            TEMP_FILE_MARKER,
            attempt,
            ext.to_string_lossy()
        ),
        None => format!("{}{}-{}", stem, TEMP_FILE_MARKER, attempt),
    };
    route.with_file_name(file_name)
}

/// Source of the renderer entry that hydrates `route` with `props`.
fn renderer_source(route: &Path, props: &str) -> String {
    let file_name = route
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        r#"import * as React from "react";
import {{ hydrateRoot }} from "react-dom/client";
import App from "./{file_name}";

const props = {props};

hydrateRoot(document.getElementById("root"), React.createElement(App, props));
"#
    )
}

/// Per-route output directory name, unique within the project.
fn route_slug(route: &Path, root: &Path) -> String {
    let relative = route.strip_prefix(root).unwrap_or(route);
    let slug: String = relative
        .with_extension("")
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    slug.trim_matches('_').to_string()
}

/// Dependency files listed under `inputs` in an esbuild metafile.
///
/// Input paths are relative to the bundler's working directory. The renderer
/// entry itself is dropped since it only exists for the duration of a build.
fn parse_meta_inputs(meta: &str, root: &Path) -> Result<Vec<PathBuf>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(meta)?;
    let Some(inputs) = value.get("inputs").and_then(|v| v.as_object()) else {
        return Ok(Vec::new());
    };

    Ok(inputs
        .keys()
        .filter(|key| !key.contains(TEMP_FILE_MARKER))
        // Namespaced virtual modules, e.g. `virtual:env`
        .filter(|key| !key.contains(':') || Path::new(key).is_absolute())
        .map(|key| normalize_path_from(key, root))
        .collect())
}

/// Compiles routes by running a configured bundler command.
#[derive(Debug)]
pub struct CommandCompiler {
    command: String,
    args: Vec<String>,
    out_dir: PathBuf,
    root: PathBuf,
    next_attempt: AtomicU64,
}

impl CommandCompiler {
    /// Create a compiler for the project at `root`.
    ///
    /// A relative `out_dir` in `config` is resolved against `root`.
    pub fn new(config: &CompilerConfig, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            out_dir: normalize_path_from(&config.out_dir, &root),
            root,
            next_attempt: AtomicU64::new(0),
        }
    }

    fn substitute_args(&self, entry: &Path, out_dir: &Path) -> Vec<String> {
        let entry = entry.to_string_lossy();
        let out_dir = out_dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{entry}", &entry).replace("{outdir}", &out_dir))
            .collect()
    }

    async fn run_bundler(
        &self,
        route: &Path,
        renderer: &Path,
        out_dir: &Path,
    ) -> Result<(), CompileError> {
        let args = self.substitute_args(renderer, out_dir);
        tracing::debug!("Running {} {}", self.command, args.join(" "));

        let output = Command::new(&self.command)
            .args(&args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CompileError::io(route, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // First diagnostic only
            let message = stderr
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} exited with {}", self.command, output.status));
            return Err(CompileError::Failed {
                entry: route.to_path_buf(),
                message,
            });
        }

        Ok(())
    }

    async fn read_artifact(
        route: &Path,
        out_dir: &Path,
        name: &str,
    ) -> Result<Option<String>, CompileError> {
        match tokio::fs::read_to_string(out_dir.join(name)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CompileError::io(route, e)),
        }
    }

    async fn read_required(
        route: &Path,
        out_dir: &Path,
        name: &str,
    ) -> Result<String, CompileError> {
        Self::read_artifact(route, out_dir, name)
            .await?
            .ok_or_else(|| CompileError::MissingArtifact {
                entry: route.to_path_buf(),
                artifact: name.to_string(),
            })
    }

    async fn collect_output(
        &self,
        route: &Path,
        out_dir: &Path,
    ) -> Result<CompileOutput, CompileError> {
        let server_code = Self::read_required(route, out_dir, SERVER_ARTIFACT).await?;
        let client_code = Self::read_required(route, out_dir, CLIENT_ARTIFACT).await?;
        let css = Self::read_artifact(route, out_dir, CSS_ARTIFACT)
            .await?
            .unwrap_or_default();

        let dependency_files = match Self::read_artifact(route, out_dir, META_ARTIFACT).await? {
            Some(meta) => parse_meta_inputs(&meta, &self.root).map_err(|e| CompileError::Failed {
                entry: route.to_path_buf(),
                message: format!("Invalid {}: {}", META_ARTIFACT, e),
            })?,
            None => {
                tracing::warn!(
                    "No {} for {}; only the route itself will trigger reloads",
                    META_ARTIFACT,
                    route.display()
                );
                Vec::new()
            }
        };

        Ok(CompileOutput {
            server_code,
            client_code,
            css,
            dependency_files,
        })
    }
}

#[async_trait]
impl Compiler for CommandCompiler {
    async fn compile(&self, entry: &Path, props: &str) -> Result<CompileOutput, CompileError> {
        // Props are inlined as a JS expression, so only accept real JSON
        serde_json::from_str::<serde_json::Value>(props).map_err(|e| CompileError::Failed {
            entry: entry.to_path_buf(),
            message: format!("Props are not valid JSON: {}", e),
        })?;

        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        let out_dir = self
            .out_dir
            .join(format!("{}-{}", route_slug(entry, &self.root), attempt));
        tokio::fs::create_dir_all(&out_dir)
            .await
            .map_err(|e| CompileError::io(entry, e))?;

        let renderer = renderer_path(entry, attempt);
        let result = match tokio::fs::write(&renderer, renderer_source(entry, props)).await {
            Ok(()) => {
                let bundled = self.run_bundler(entry, &renderer, &out_dir).await;
                if let Err(e) = tokio::fs::remove_file(&renderer).await {
                    tracing::warn!("Failed to remove {}: {}", renderer.display(), e);
                }
                match bundled {
                    Ok(()) => self.collect_output(entry, &out_dir).await,
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(CompileError::io(entry, e)),
        };

        // Artifacts were read into memory
        if let Err(e) = tokio::fs::remove_dir_all(&out_dir).await {
            tracing::warn!("Failed to remove {}: {}", out_dir.display(), e);
        }

        result
    }
}
