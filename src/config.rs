//! TOML configuration.
//!
//! ```toml
//! metadata_interval = 100
//!
//! [macros]
//! http = 'proto.name == "http"'
//! probe = 'request.headers["user-agent"].startsWith("kube-probe")'
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;

/// Records between two progress frames when nothing else is configured.
pub const DEFAULT_METADATA_INTERVAL: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Emit a `/metadata` frame after this many records; 0 only at the end.
    pub metadata_interval: usize,
    /// Macro name to expansion text.
    pub macros: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            metadata_interval: DEFAULT_METADATA_INTERVAL,
            macros: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = text.parse()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!("interval = 3".parse::<Config>().is_err());
    }
}
