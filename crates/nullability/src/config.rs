use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "NULLCHECK_CONFIG";
pub const CONFIG_FILE_NAME: &str = "nullcheck.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NullcheckConfig {
    pub resolve: ResolveConfig,
    pub check: CheckConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Treat declarations outside any `[[region]]` as audited.
    pub default_audited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NilComparisonPolicy {
    /// `x == nil` type-checks for every operand type.
    #[default]
    Any,
    /// Only optional or reference-like operands compare against nil silently.
    ReferenceOnly,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub nil_comparison: NilComparisonPolicy,
    pub conditional_unwrap_notes: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            nil_comparison: NilComparisonPolicy::Any,
            conditional_unwrap_notes: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl NullcheckConfig {
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a config file the caller asked for by name; failures are errors.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Discover a config from `NULLCHECK_CONFIG` or `nullcheck.toml` in
    /// `directory`. Anything unreadable falls back to defaults.
    pub fn discover(directory: &Path) -> Self {
        let Some(path) = Self::find_config_path(directory) else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::debug!("loaded config from {}", path.display());
                config
            }
            Err(err) => {
                tracing::warn!("{err}; using default configuration");
                Self::default()
            }
        }
    }

    fn find_config_path(directory: &Path) -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!(
                "{} set but file not found: {}",
                CONFIG_ENV,
                path.display()
            );
        }

        let local = directory.join(CONFIG_FILE_NAME);
        if local.exists() { Some(local) } else { None }
    }
}
