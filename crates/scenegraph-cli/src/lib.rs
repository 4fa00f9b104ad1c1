//! # scenegraph-cli
//!
//! Command-line tools for SceneGraph:
//! - Parsing and inspecting node type templates
//! - Summarising and validating scene files
//! - Replaying JSON command scripts against a scene
//! - Managing the user configuration file

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_handlers;
pub mod error;

pub use config::SceneGraphConfig;
pub use error::{Error, Result};
