//! Shared helpers for command implementations.

use crate::config::{ConfigOverrides, KilnConfig};
use crate::dev::DevConfig;
use crate::error::{CliError, Result, ResultExt};
use std::path::{Path, PathBuf};

/// Resolve a path relative to a working directory.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Working directory for a command: `--cwd` or the process directory.
pub fn working_dir(cwd: Option<&Path>) -> Result<PathBuf> {
    let current = std::env::current_dir().context("Failed to read current directory")?;
    Ok(match cwd {
        Some(cwd) => resolve_path(cwd, &current),
        None => current,
    })
}

/// Load, validate and resolve the project configuration.
pub fn load_dev_config(
    overrides: &ConfigOverrides,
    config_path: Option<&Path>,
    cwd: &Path,
) -> Result<DevConfig> {
    let config = KilnConfig::load(overrides, config_path, cwd)?;
    let root = config.project_root(cwd);
    config.validate(&root)?;
    Ok(DevConfig::from_config(&config, cwd))
}

/// Ensure a route entry exists and is a file.
pub fn validate_route(route: &Path) -> Result<()> {
    let metadata = std::fs::metadata(route).with_path(route)?;

    if !metadata.is_file() {
        return Err(CliError::InvalidArgument(format!(
            "Route is not a file: {}",
            route.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_path() {
        let cwd = Path::new("/project");
        assert_eq!(
            resolve_path(Path::new("frontend"), cwd),
            PathBuf::from("/project/frontend")
        );
        assert_eq!(resolve_path(Path::new("/abs"), cwd), PathBuf::from("/abs"));
    }

    #[test]
    fn test_validate_route() {
        let temp = TempDir::new().unwrap();
        let route = temp.path().join("Home.tsx");

        assert!(matches!(
            validate_route(&route),
            Err(CliError::FileNotFound(_))
        ));

        std::fs::write(&route, "export default () => null;").unwrap();
        assert!(validate_route(&route).is_ok());

        assert!(matches!(
            validate_route(temp.path()),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    #[serial]
    fn test_load_dev_config_resolves_against_cwd() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("frontend")).unwrap();

        let overrides = ConfigOverrides {
            hot_reload_port: Some(4100),
            ..Default::default()
        };
        let config = load_dev_config(&overrides, None, temp.path()).unwrap();

        assert_eq!(config.hot_reload_port, 4100);
        assert!(config.frontend_dir.ends_with("frontend"));
        assert!(config.frontend_dir.is_absolute());
    }

    #[test]
    #[serial]
    fn test_load_dev_config_requires_frontend_dir() {
        let temp = TempDir::new().unwrap();
        let err = load_dev_config(&ConfigOverrides::default(), None, temp.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
