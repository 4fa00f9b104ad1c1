//! Command-line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SceneGraph - node graph templates and scene files
#[derive(Parser, Debug)]
#[command(name = "scenegraph")]
#[command(author, version, about = "SceneGraph template and scene tool", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SCENEGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a node type template and print it as JSON
    Template {
        /// Template file (`.mtd`)
        file: PathBuf,
        /// Keep values that fail to parse as raw strings
        #[arg(long)]
        keep_raw: bool,
    },
    /// Summarise a scene file
    Info {
        /// Scene file (JSON)
        scene: PathBuf,
    },
    /// Check that a scene file loads cleanly
    Validate {
        /// Scene file (JSON)
        scene: PathBuf,
    },
    /// Replay a JSON list of graph commands against a scene
    Apply {
        /// Scene file (JSON)
        scene: PathBuf,
        /// Command script (JSON array)
        script: PathBuf,
        /// Output file; defaults to overwriting the scene
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write an empty scene file
    New {
        /// Output file
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved config file path
    Path,
    /// Print the effective configuration as TOML
    Show,
    /// Print one value by dotted key (e.g. `graph.undo_limit`)
    Get {
        /// Dotted key
        key: String,
    },
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
