//! SceneGraph Graph: nodes, edges, and the mutation engine.
//!
//! This crate holds the in-memory scene graph: typed nodes built from
//! attribute templates, port-to-port edges, and the operations that edit
//! them while keeping the graph valid.
//!
//! # Modules
//!
//! - [`attribute`]: Attributes, ports and attribute properties
//! - [`node`]: Nodes, geometry, and unique naming
//! - [`registry`]: Node types and their templates
//! - [`edge`]: Edges and edge keys
//! - [`graph`]: The graph and its mutation engine
//! - [`command`]: Serializable commands for scripted editing
//! - [`snapshot`]: Snapshots, restore, and scene files
//! - [`history`]: Snapshot diffs and undo/redo
//! - [`event`]: Change notifications
//! - [`config`]: Graph settings
//!
//! # Example
//!
//! ```rust
//! use scenegraph_graph::{EdgeSpec, Graph, NodeOptions, UndoStack};
//!
//! let mut graph = Graph::new();
//! let mut undo = UndoStack::from_config(graph.config());
//!
//! let plate = graph.add_node("asset", NodeOptions::new().with_name("plate")).unwrap();
//! let (_, cmd) = graph
//!     .record("add grade", |g| {
//!         let grade = g.add_node("default", NodeOptions::new().with_name("grade"))?;
//!         g.add_edge(EdgeSpec::new(plate, "output", grade, "input"), false)
//!     })
//!     .unwrap();
//! undo.push(cmd.unwrap(), &mut graph).unwrap();
//!
//! undo.undo(&mut graph).unwrap();
//! assert_eq!(graph.node_count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attribute;
pub mod command;
pub mod config;
pub mod edge;
pub mod event;
pub mod graph;
pub mod history;
pub mod node;
pub mod registry;
pub mod snapshot;

mod proptests;

// Re-export key types at crate root for convenience
pub use attribute::{Attribute, AttributeProps};
pub use command::{CommandOutput, GraphCommand, NodeRef};
pub use config::{DEFAULT_UNDO_LIMIT, GraphConfig};
pub use edge::{Edge, EdgeKey, EdgeSpec, EdgeStyle};
pub use event::GraphEvent;
pub use graph::{DOT_NODE_TYPE, Evaluation, Graph, NodeOptions};
pub use history::{CommandState, DictDiffer, UndoCommand, UndoStack};
pub use node::{Geometry, NameRegistry, NameTable, Node, NodeKind};
pub use registry::{NodeTypeRegistry, NodeTypeSpec};
pub use snapshot::{GraphSnapshot, NodeSnapshot, SnapshotDiff};
