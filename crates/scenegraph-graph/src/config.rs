//! Graph behaviour settings.

use scenegraph_template::UnparsedValuePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of undo steps kept by an [`UndoStack`](crate::UndoStack).
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// Settings that shape how a [`Graph`](crate::Graph) validates mutations.
///
/// # Example
///
/// ```rust
/// use scenegraph_graph::GraphConfig;
///
/// let config = GraphConfig::default().with_allow_cycles(true).with_undo_limit(10);
/// assert!(config.allow_cycles);
/// assert_eq!(config.undo_limit, 10);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Accept edges that close a cycle.
    pub allow_cycles: bool,
    /// Maximum undo steps kept; 0 keeps everything.
    pub undo_limit: usize,
    /// How template values that fail to parse are handled.
    pub unparsed_values: UnparsedValuePolicy,
    /// Extra directories scanned for `*.mtd` node type templates.
    pub template_dirs: Vec<PathBuf>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            allow_cycles: false,
            undo_limit: DEFAULT_UNDO_LIMIT,
            unparsed_values: UnparsedValuePolicy::default(),
            template_dirs: Vec::new(),
        }
    }
}

impl GraphConfig {
    /// Sets whether cycles are allowed.
    pub fn with_allow_cycles(mut self, allow: bool) -> Self {
        self.allow_cycles = allow;
        self
    }

    /// Sets the undo limit.
    pub fn with_undo_limit(mut self, limit: usize) -> Self {
        self.undo_limit = limit;
        self
    }

    /// Sets the unparsed value policy.
    pub fn with_unparsed_values(mut self, policy: UnparsedValuePolicy) -> Self {
        self.unparsed_values = policy;
        self
    }

    /// Adds a template directory.
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dirs.push(dir.into());
        self
    }
}
