use crate::config::{CompilerConfig, KilnConfig, CONFIG_FILE_NAME};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Scalar keys that may be set through `KILN_*` environment variables.
const ENV_KEYS: &[&str] = &[
    "frontend_dir",
    "layout_file",
    "global_css_file",
    "tailwind_config",
    "hot_reload_port",
    "debounce_ms",
];

/// Values supplied on the command line.
///
/// Only fields that are `Some` are merged, so an absent flag never masks a
/// value from the config file or environment.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_reload_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

/// `hot_reload_port` -> `hotReloadPort`
fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

impl KilnConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    ///
    /// `config_path` must exist when given; otherwise `kiln.config.json` in
    /// `cwd` is used if present.
    pub fn load(
        overrides: &ConfigOverrides,
        config_path: Option<&Path>,
        cwd: &Path,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default_config()));

        let config_file = match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    cwd.join(path)
                };
                if !path.exists() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => {
                let default_path = cwd.join(CONFIG_FILE_NAME);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            tracing::debug!("Loading config from {}", path.display());
            figment = figment.merge(Json::file(path));
        }

        // KILN_HOT_RELOAD_PORT -> hotReloadPort, ...
        figment = figment.merge(
            Env::prefixed("KILN_")
                .only(ENV_KEYS)
                .map(|key| snake_to_camel(key.as_str()).into())
                .lowercase(false),
        );

        figment = figment.merge(Serialized::defaults(overrides));

        figment.extract().map_err(|e| {
            ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: format!("Check {} syntax and field types", CONFIG_FILE_NAME),
            }
            .into()
        })
    }

    pub(crate) fn default_config() -> Self {
        use crate::config::defaults::*;

        Self {
            frontend_dir: default_frontend_dir(),
            layout_file: default_layout_file(),
            global_css_file: None,
            tailwind_config: None,
            hot_reload_port: default_hot_reload_port(),
            debounce_ms: 0,
            compiler: CompilerConfig::default(),
            stylesheet: None,
            cwd: None,
        }
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, root: &Path, path: &Path) -> PathBuf {
        kiln_graph::normalize_path_from(path, root)
    }

    /// Project root: the configured `cwd` (relative to `base`) or `base` itself.
    pub fn project_root(&self, base: &Path) -> PathBuf {
        match &self.cwd {
            Some(cwd) => kiln_graph::normalize_path_from(cwd, base),
            None => kiln_graph::normalize_path(base),
        }
    }
}
