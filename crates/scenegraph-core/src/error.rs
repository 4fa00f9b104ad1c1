//! Error types for SceneGraph operations.
//!
//! Graph mutation failures are validation errors: they describe a request the
//! host made that would break a graph invariant, and are always reported to
//! the caller. Template parsing never produces these errors; parse problems
//! are collected as warnings instead.

use std::path::{Path, PathBuf};

/// Errors that can occur while building or mutating a scene graph.
///
/// All error variants are marked with `#[non_exhaustive]` to allow
/// adding new error types without breaking changes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No node with the given id exists in the graph.
    #[error("Node not found: {id}")]
    NodeNotFound {
        /// Id (or name) that was looked up
        id: String,
    },

    /// The node has no attribute with the given name.
    #[error("Attribute not found: {node}.{attribute}")]
    AttributeNotFound {
        /// Owning node name
        node: String,
        /// Attribute name
        attribute: String,
    },

    /// The node has no port (connectable attribute) with the given name.
    #[error("Port not found: {node}.{port}")]
    PortNotFound {
        /// Owning node name
        node: String,
        /// Port name
        port: String,
    },

    /// No edge matches the requested endpoints.
    #[error("Edge not found: {edge}")]
    EdgeNotFound {
        /// Human-readable edge description
        edge: String,
    },

    /// The attribute exists but cannot take part in an edge.
    #[error("Attribute is not connectable: {node}.{attribute}")]
    NotConnectable {
        /// Owning node name
        node: String,
        /// Attribute name
        attribute: String,
    },

    /// An edge was requested from an input port or into an output port.
    #[error("Invalid connection direction: {node}.{port} is not an {expected} port")]
    InvalidDirection {
        /// Owning node name
        node: String,
        /// Port name
        port: String,
        /// Direction the port was required to have
        expected: String,
    },

    /// An edge would connect a node to itself.
    #[error("Cannot connect node to itself: {node}")]
    SelfLoop {
        /// Node name
        node: String,
    },

    /// An identical edge already exists.
    #[error("Edge already exists: {edge}")]
    DuplicateEdge {
        /// Human-readable edge description
        edge: String,
    },

    /// The port already holds its maximum number of edges.
    #[error("Port {node}.{port} is at capacity ({max} connections)")]
    CapacityExceeded {
        /// Owning node name
        node: String,
        /// Port name
        port: String,
        /// Maximum number of connections allowed on the port
        max: usize,
    },

    /// The edge would close a cycle in a graph configured as acyclic.
    #[error("Edge would create a cycle: {edge}")]
    CycleDetected {
        /// Human-readable edge description
        edge: String,
    },

    /// The attribute name collides with a built-in node field.
    #[error("Attribute name is reserved: {name}")]
    ReservedName {
        /// Requested name
        name: String,
    },

    /// An attribute with this name already exists on the node.
    #[error("Attribute already exists: {node}.{attribute}")]
    AttributeExists {
        /// Owning node name
        node: String,
        /// Attribute name
        attribute: String,
    },

    /// The value does not fit the attribute's declared type.
    #[error("Type mismatch for {attribute}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Attribute name
        attribute: String,
        /// Declared type
        expected: String,
        /// Type of the rejected value
        found: String,
    },

    /// The attribute is locked and cannot be modified.
    #[error("Attribute is locked: {node}.{attribute}")]
    Locked {
        /// Owning node name
        node: String,
        /// Attribute name
        attribute: String,
    },

    /// The port still has edges attached.
    #[error("Port is in use: {node}.{port}")]
    PortInUse {
        /// Owning node name
        node: String,
        /// Port name
        port: String,
    },

    /// The operation is not supported by this kind of node.
    #[error("Unsupported operation on {node_type} node: {message}")]
    Unsupported {
        /// Node type tag
        node_type: String,
        /// What was attempted
        message: String,
    },

    /// No node type is registered under this tag.
    #[error("Unknown node type: {node_type}")]
    UnknownNodeType {
        /// Requested node type tag
        node_type: String,
    },

    /// A snapshot could not be restored.
    #[error("Invalid snapshot: {message}")]
    InvalidSnapshot {
        /// What was wrong with the snapshot
        message: String,
    },

    /// I/O error, optionally tied to a file path.
    #[error("I/O error{}: {source}", path_suffix(.path))]
    Io {
        /// Underlying error
        #[source]
        source: std::io::Error,
        /// File involved, if known
        path: Option<PathBuf>,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

/// Convenience `Result` type alias for SceneGraph operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source, path: None }
    }
}

impl Error {
    /// Returns whether this error reports an invalid graph request.
    ///
    /// Validation errors leave the graph untouched; the host can correct
    /// the request and retry. I/O, serialization and configuration errors
    /// are environmental.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Error::Io { .. } | Error::Json(_) | Error::Config { .. }
        )
    }

    /// Creates a node-not-found error.
    pub fn node_not_found(id: impl ToString) -> Self {
        Error::NodeNotFound { id: id.to_string() }
    }

    /// Creates an attribute-not-found error.
    pub fn attribute_not_found(node: impl Into<String>, attribute: impl Into<String>) -> Self {
        Error::AttributeNotFound {
            node: node.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates a port-not-found error.
    pub fn port_not_found(node: impl Into<String>, port: impl Into<String>) -> Self {
        Error::PortNotFound {
            node: node.into(),
            port: port.into(),
        }
    }

    /// Creates a capacity error for a full port.
    pub fn capacity(node: impl Into<String>, port: impl Into<String>, max: usize) -> Self {
        Error::CapacityExceeded {
            node: node.into(),
            port: port.into(),
            max,
        }
    }

    /// Creates an invalid-snapshot error.
    pub fn invalid_snapshot<S: Into<String>>(message: S) -> Self {
        Error::InvalidSnapshot {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path that caused it.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            source,
            path: Some(path.as_ref().to_path_buf()),
        }
    }
}
