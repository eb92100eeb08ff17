//! `tokenguard.toml` configuration.
//!
//! Every key is optional; command-line flags take precedence. Relative
//! paths are resolved against the directory holding the config file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_CONFIG: &str = "tokenguard.toml";

pub const DEFAULT_EXTENSIONS: [&str; 4] = ["tsx", "jsx", "ts", "js"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("legacy check '{name}' has an empty command")]
    EmptyCommand { name: String },

    #[error("legacy check name '{name}' is declared more than once")]
    DuplicateLegacy { name: String },
}

/// An external check script declared in the config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyCheck {
    pub name: String,
    /// Program followed by its fixed arguments.
    pub command: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub registry: Option<PathBuf>,
    pub attributes: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
    pub jobs: Option<usize>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub legacy: Vec<LegacyCheck>,
    /// Directory the config was loaded from; legacy commands run here.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Config::from_toml_str(&text, base_dir).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(text: &str, base_dir: PathBuf) -> Result<Config, ConfigError> {
        let mut config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        let mut seen = std::collections::BTreeSet::new();
        for check in &config.legacy {
            if check.command.is_empty() {
                return Err(ConfigError::EmptyCommand {
                    name: check.name.clone(),
                });
            }
            if !seen.insert(check.name.as_str()) {
                return Err(ConfigError::DuplicateLegacy {
                    name: check.name.clone(),
                });
            }
        }

        if let Some(registry) = &config.registry {
            if registry.is_relative() {
                config.registry = Some(base_dir.join(registry));
            }
        }
        config.base_dir = base_dir;
        Ok(config)
    }

    /// Load `explicit` if given, else `tokenguard.toml` in the working
    /// directory when present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = explicit {
            return Config::load(path);
        }
        let default = Path::new(DEFAULT_CONFIG);
        if default.is_file() {
            tracing::debug!(path = %default.display(), "using default config");
            return Config::load(default);
        }
        Ok(Config {
            base_dir: PathBuf::from("."),
            ..Config::default()
        })
    }

    pub fn extensions(&self) -> Vec<String> {
        match &self.extensions {
            Some(exts) => exts
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            None => DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}
