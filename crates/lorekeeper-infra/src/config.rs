//! Configuration loader for Lorekeeper.
//!
//! Reads `lorekeeper.toml` and deserializes it into [`AppConfig`]. The file
//! is looked up at an explicit path, then `$LOREKEEPER_CONFIG`, then the
//! platform config directory. Only the last of these may be absent.

use std::path::{Path, PathBuf};

use lorekeeper_types::config::AppConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "LOREKEEPER_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where the config file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by the caller or the environment; must exist.
    Explicit(PathBuf),
    /// Conventional location; defaults apply when absent.
    Default(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Default(p) => p,
        }
    }
}

/// Resolve the config file location.
pub fn resolve_config_source(explicit: Option<&Path>) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.trim().is_empty()
    {
        return ConfigSource::Explicit(PathBuf::from(path));
    }
    ConfigSource::Default(default_config_path())
}

/// `{config_dir}/lorekeeper/lorekeeper.toml`, or `./lorekeeper.toml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("lorekeeper").join("lorekeeper.toml"))
        .unwrap_or_else(|| PathBuf::from("lorekeeper.toml"))
}

/// Load and validate configuration.
///
/// - A missing file at the default location yields [`AppConfig::default()`].
/// - A missing explicit file, an unreadable file, or malformed TOML is an error.
pub async fn load_config(source: &ConfigSource) -> Result<AppConfig, ConfigError> {
    let path = source.path();

    let config = match tokio::fs::read_to_string(path).await {
        Ok(content) => toml::from_str::<AppConfig>(&content).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?,
        Err(err)
            if err.kind() == std::io::ErrorKind::NotFound
                && matches!(source, ConfigSource::Default(_)) =>
        {
            tracing::debug!("No config file at {}, using defaults", path.display());
            AppConfig::default()
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}
