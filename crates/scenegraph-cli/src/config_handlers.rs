//! Handler functions for config CLI commands.
//!
//! Implements the `config` subcommands (`path`, `show`, `get`, `init`) over
//! [`SceneGraphConfig`], plus the TOML dotted-key helpers they use.

use crate::cli::ConfigAction;
use crate::config::{PROJECT_NAME, SceneGraphConfig};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Command dispatch
// ============================================================================

/// Handle a config subcommand.
pub fn handle_config_command(config_path: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path(config_path),
        ConfigAction::Show => cmd_config_show(config_path),
        ConfigAction::Get { key } => cmd_config_get(config_path, &key),
        ConfigAction::Init { force } => {
            let path = SceneGraphConfig::resolve_config_path(config_path)
                .ok_or_else(|| Error::config("Could not determine config directory"))?;
            cmd_config_init(&path, force).map(|_| ())
        }
    }
}

// ============================================================================
// Command handlers
// ============================================================================

/// Show the resolved config file path.
pub fn cmd_config_path(config_path: Option<&Path>) -> Result<()> {
    match SceneGraphConfig::resolve_config_path(config_path) {
        Some(path) => {
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("(file does not exist; run `{PROJECT_NAME} config init` to create it)");
            }
            Ok(())
        }
        None => Err(Error::config(
            "Could not determine config directory for this platform",
        )),
    }
}

/// Print the effective configuration.
pub fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = SceneGraphConfig::load(config_path)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Print a configuration value by dotted key.
pub fn cmd_config_get(config_path: Option<&Path>, key: &str) -> Result<()> {
    let config = SceneGraphConfig::load(config_path)?;
    println!("{}", lookup_key(&config, key)?);
    Ok(())
}

/// Resolve a dotted key against the effective configuration.
pub fn lookup_key(config: &SceneGraphConfig, key: &str) -> Result<String> {
    let value = toml::Value::try_from(config).map_err(|e| Error::config(e.to_string()))?;
    get_nested_value(&value, key)
        .map(format_toml_value)
        .ok_or_else(|| Error::config(format!("Key '{key}' not found in configuration")))
}

/// Write a default configuration file to `path`.
pub fn cmd_config_init(path: &Path, force: bool) -> Result<PathBuf> {
    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| scenegraph_core::Error::io_with_path(e, parent))?;
    }

    let toml_str = SceneGraphConfig::default().to_toml_string()?;
    fs::write(path, toml_str).map_err(|e| scenegraph_core::Error::io_with_path(e, path))?;

    println!("Config file created at {}", path.display());
    Ok(path.to_path_buf())
}

// ============================================================================
// TOML dotted-key helpers
// ============================================================================

/// Navigate a dotted key path in a TOML value tree.
pub fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_table()?.get(part))
}

/// Format a TOML value for display on stdout.
pub fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) => value.to_string(),
        toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
