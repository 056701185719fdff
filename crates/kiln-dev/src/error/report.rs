//! Miette diagnostic conversion for CLI errors.

use crate::error::{CliError, CompileError, ConfigError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => config_error_to_miette(e),
        CliError::Compile(e) => compile_error_to_miette(e),
        CliError::Watch(e) => miette::miette!(
            "Hot reload is unavailable: {}\n\nHint: Check that frontendDir exists and is readable",
            e
        ),
        _ => miette::miette!("{}", err),
    }
}

fn config_error_to_miette(err: ConfigError) -> Report {
    miette::miette!("Configuration error: {}", err)
}

fn compile_error_to_miette(err: CompileError) -> Report {
    match err {
        CompileError::MissingArtifact { entry, artifact } => miette::miette!(
            "Compiler produced no {} for {}\n\nHint: The compiler command must write {} into {{outdir}}",
            artifact,
            entry.display(),
            artifact
        ),
        other => miette::miette!("{}", other),
    }
}
