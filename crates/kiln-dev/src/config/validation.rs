use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};
use std::path::Path;

/// Validate that a program name is usable as a command.
pub fn validate_command(field: &str, command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: field.to_string(),
            hint: "Provide the program to run, e.g. \"node\" or \"npx\"".to_string(),
        }
        .into());
    }
    Ok(())
}

impl KilnConfig {
    /// Validate configuration for logical consistency.
    ///
    /// Paths are checked against `root`, the resolved project root.
    pub fn validate(&self, root: &Path) -> Result<()> {
        if self.hot_reload_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hotReloadPort".to_string(),
                value: "0".to_string(),
                hint: "Use a port between 1 and 65535".to_string(),
            }
            .into());
        }

        let frontend_dir = self.resolve(root, &self.frontend_dir);
        if !frontend_dir.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "frontendDir".to_string(),
                value: frontend_dir.display().to_string(),
                hint: "Frontend directory does not exist".to_string(),
            }
            .into());
        }

        validate_command("compiler.command", &self.compiler.command)?;

        if let Some(stylesheet) = &self.stylesheet {
            validate_command("stylesheet.command", &stylesheet.command)?;
            if self.global_css_file.is_none() {
                return Err(ConfigError::MissingField {
                    field: "globalCssFile".to_string(),
                    hint: "A stylesheet command needs a globalCssFile to build from".to_string(),
                }
                .into());
            }
        }

        if self.tailwind_config.is_some() && self.stylesheet.is_none() {
            tracing::warn!(
                "tailwindConfig is set but no stylesheet command is configured; component edits will not rebuild styles"
            );
        }

        Ok(())
    }
}
