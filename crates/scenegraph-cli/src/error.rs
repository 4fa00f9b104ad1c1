//! Error types for scenegraph-cli

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scenegraph-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in scenegraph-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from the graph or template crates
    #[error("{0}")]
    Core(#[from] scenegraph_core::Error),

    /// Writing command output failed
    #[error("Output error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Configuration problem
    #[error("Config error: {0}")]
    Config(String),

    /// A scene file failed validation
    #[error("Scene {} is invalid: {message}", path.display())]
    InvalidScene {
        /// Scene file
        path: PathBuf,
        /// What was wrong
        message: String,
    },

    /// A command script could not be read
    #[error("Script {} is invalid: {message}", path.display())]
    InvalidScript {
        /// Script file
        path: PathBuf,
        /// What was wrong
        message: String,
    },
}

impl Error {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}
