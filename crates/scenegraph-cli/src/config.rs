//! CLI configuration.
//!
//! Loaded from TOML: the `-c/--config` path if given, otherwise
//! `<config dir>/scenegraph/config.toml`, otherwise built-in defaults.
//!
//! ```toml
//! [graph]
//! allow_cycles = false
//! undo_limit = 100
//! unparsed_values = "drop"
//! template_dirs = ["/studio/templates"]
//!
//! [log]
//! level = "warn"
//! ```

use crate::error::{Error, Result};
use scenegraph_graph::GraphConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name used for the config directory and in messages.
pub const PROJECT_NAME: &str = "scenegraph";

/// Default log filter when neither `-v` nor `SCENEGRAPH_LOG` is set.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `warn` or `scenegraph_graph=debug`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Top-level CLI configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneGraphConfig {
    /// Graph behaviour.
    pub graph: GraphConfig,
    /// Logging.
    pub log: LogConfig,
}

impl SceneGraphConfig {
    /// Default config file location for this platform.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PROJECT_NAME).join("config.toml"))
    }

    /// The explicit path if given, otherwise the default location.
    pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path)
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit) {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) if explicit.is_some() => Err(Error::config(format!(
                "Config file not found at {}",
                path.display()
            ))),
            _ => Ok(Self::default()),
        }
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| scenegraph_core::Error::io_with_path(e, path))?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Serializes to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}
