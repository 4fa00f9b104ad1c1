//! Serializable graph commands.
//!
//! Every mutation on [`Graph`] has a [`GraphCommand`] counterpart, so a
//! host (or the CLI) can drive a graph from a JSON script:
//!
//! ```json
//! [
//!   {"op": "add_node", "node_type": "asset", "name": "plate"},
//!   {"op": "add_node", "node_type": "default", "name": "grade"},
//!   {"op": "add_edge", "src": "plate", "dest": "grade"}
//! ]
//! ```
//!
//! Nodes are referenced by id or by name ([`NodeRef`]).

use crate::attribute::AttributeProps;
use crate::edge::{DEFAULT_WEIGHT, EdgeKey, EdgeSpec, EdgeStyle};
use crate::graph::{Graph, NodeOptions};
use crate::node::{INPUT_PORT, OUTPUT_PORT};
use indexmap::IndexMap;
use log::debug;
use scenegraph_core::{Error, NodeId, Result, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_weight() -> f32 {
    DEFAULT_WEIGHT
}

fn default_output() -> String {
    OUTPUT_PORT.to_string()
}

fn default_input() -> String {
    INPUT_PORT.to_string()
}

// ============================================================================
// NodeRef
// ============================================================================

/// A node addressed by id or by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    /// Stable id.
    Id(NodeId),
    /// Current display name.
    Name(String),
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef::Id(id)
    }
}

impl From<&str> for NodeRef {
    fn from(name: &str) -> Self {
        NodeRef::Name(name.to_string())
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Id(id) => write!(f, "{id}"),
            NodeRef::Name(name) => f.write_str(name),
        }
    }
}

// ============================================================================
// GraphCommand
// ============================================================================

/// One graph mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphCommand {
    /// Adds a node.
    AddNode {
        /// Registered type tag.
        node_type: String,
        /// Requested name.
        #[serde(default)]
        name: Option<String>,
        /// Position.
        #[serde(default)]
        pos: [f64; 2],
        /// Color override.
        #[serde(default)]
        color: Option<[u8; 4]>,
        /// Attribute values.
        #[serde(default)]
        attributes: IndexMap<String, Value>,
    },
    /// Removes a node and its edges.
    RemoveNode {
        /// Node to remove.
        node: NodeRef,
    },
    /// Connects two ports.
    AddEdge {
        /// Source node.
        src: NodeRef,
        /// Source port.
        #[serde(default = "default_output")]
        src_attr: String,
        /// Destination node.
        dest: NodeRef,
        /// Destination port.
        #[serde(default = "default_input")]
        dest_attr: String,
        /// Edge weight.
        #[serde(default = "default_weight")]
        weight: f32,
        /// Drawing style.
        #[serde(default)]
        style: EdgeStyle,
        /// Evict existing edges on a full destination port.
        #[serde(default)]
        force: bool,
    },
    /// Removes one edge.
    RemoveEdge {
        /// Source node.
        src: NodeRef,
        /// Source port.
        #[serde(default = "default_output")]
        src_attr: String,
        /// Destination node.
        dest: NodeRef,
        /// Destination port.
        #[serde(default = "default_input")]
        dest_attr: String,
    },
    /// Removes every edge from `src` to `dest`.
    RemoveEdgesBetween {
        /// Source node.
        src: NodeRef,
        /// Destination node.
        dest: NodeRef,
    },
    /// Inserts a dot node into an edge.
    SplitEdge {
        /// Source node.
        src: NodeRef,
        /// Source port.
        #[serde(default = "default_output")]
        src_attr: String,
        /// Destination node.
        dest: NodeRef,
        /// Destination port.
        #[serde(default = "default_input")]
        dest_attr: String,
        /// Dot position.
        #[serde(default)]
        pos: [f64; 2],
    },
    /// Detaches a node, bridging its neighbours when possible.
    PopNode {
        /// Node to pop.
        node: NodeRef,
    },
    /// Renames a node.
    RenameNode {
        /// Node to rename.
        node: NodeRef,
        /// Requested name.
        name: String,
    },
    /// Moves a node to an absolute position.
    SetPosition {
        /// Node to move.
        node: NodeRef,
        /// New position.
        pos: [f64; 2],
    },
    /// Moves a node by an offset.
    MoveBy {
        /// Node to move.
        node: NodeRef,
        /// Offset.
        delta: [f64; 2],
        /// Also move everything downstream.
        #[serde(default)]
        downstream: bool,
    },
    /// Sets a node's color.
    SetColor {
        /// Node to recolor.
        node: NodeRef,
        /// RGBA color.
        color: [u8; 4],
    },
    /// Enables or disables a node.
    SetEnabled {
        /// Node to change.
        node: NodeRef,
        /// New flag.
        enabled: bool,
    },
    /// Sets an attribute value.
    SetAttribute {
        /// Owning node.
        node: NodeRef,
        /// Attribute name.
        attribute: String,
        /// New value.
        value: Value,
    },
    /// Adds an attribute.
    AddAttribute {
        /// Owning node.
        node: NodeRef,
        /// Attribute name.
        attribute: String,
        /// Initial value.
        #[serde(default)]
        value: Value,
        /// Attribute properties.
        #[serde(default)]
        props: AttributeProps,
    },
    /// Renames an attribute.
    RenameAttribute {
        /// Owning node.
        node: NodeRef,
        /// Current name.
        old: String,
        /// New name.
        new: String,
    },
    /// Removes an attribute.
    RemoveAttribute {
        /// Owning node.
        node: NodeRef,
        /// Attribute name.
        attribute: String,
    },
}

impl GraphCommand {
    /// Short description used as undo text.
    pub fn label(&self) -> &'static str {
        match self {
            GraphCommand::AddNode { .. } => "add node",
            GraphCommand::RemoveNode { .. } => "remove node",
            GraphCommand::AddEdge { .. } => "add edge",
            GraphCommand::RemoveEdge { .. } => "remove edge",
            GraphCommand::RemoveEdgesBetween { .. } => "remove edges",
            GraphCommand::SplitEdge { .. } => "split edge",
            GraphCommand::PopNode { .. } => "pop node",
            GraphCommand::RenameNode { .. } => "rename node",
            GraphCommand::SetPosition { .. } | GraphCommand::MoveBy { .. } => "move node",
            GraphCommand::SetColor { .. } => "set color",
            GraphCommand::SetEnabled { .. } => "set enabled",
            GraphCommand::SetAttribute { .. } => "set attribute",
            GraphCommand::AddAttribute { .. } => "add attribute",
            GraphCommand::RenameAttribute { .. } => "rename attribute",
            GraphCommand::RemoveAttribute { .. } => "remove attribute",
        }
    }
}

/// What a command produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutput {
    /// Nothing worth reporting.
    Done,
    /// A node was created.
    Node(NodeId),
    /// An edge was created.
    Edge(EdgeKey),
    /// Edges were removed.
    RemovedEdges(Vec<EdgeKey>),
    /// A bridging edge was created, if any.
    Popped(Option<EdgeKey>),
    /// The name granted to a renamed node.
    Renamed(String),
    /// Nodes that moved.
    Moved(Vec<NodeId>),
}

// ============================================================================
// Graph integration
// ============================================================================

impl Graph {
    /// Resolves a node reference to an id.
    pub fn resolve(&self, node: &NodeRef) -> Result<NodeId> {
        match node {
            NodeRef::Id(id) if self.contains_node(*id) => Ok(*id),
            NodeRef::Id(id) => Err(Error::node_not_found(id)),
            NodeRef::Name(name) => self
                .node_by_name(name)
                .map(|n| n.id())
                .ok_or_else(|| Error::node_not_found(name)),
        }
    }

    fn resolve_key(
        &self,
        src: &NodeRef,
        src_attr: &str,
        dest: &NodeRef,
        dest_attr: &str,
    ) -> Result<EdgeKey> {
        Ok(EdgeKey::new(
            self.resolve(src)?,
            src_attr,
            self.resolve(dest)?,
            dest_attr,
        ))
    }

    /// Runs one command.
    pub fn apply(&mut self, command: GraphCommand) -> Result<CommandOutput> {
        debug!("Applying {}", command.label());
        let output = match command {
            GraphCommand::AddNode {
                node_type,
                name,
                pos,
                color,
                attributes,
            } => {
                let options = NodeOptions {
                    name,
                    pos,
                    color,
                    attributes,
                };
                CommandOutput::Node(self.add_node(&node_type, options)?)
            }
            GraphCommand::RemoveNode { node } => {
                self.remove_node(self.resolve(&node)?)?;
                CommandOutput::Done
            }
            GraphCommand::AddEdge {
                src,
                src_attr,
                dest,
                dest_attr,
                weight,
                style,
                force,
            } => {
                let spec = EdgeSpec::new(self.resolve(&src)?, src_attr, self.resolve(&dest)?, dest_attr)
                    .with_weight(weight)
                    .with_style(style);
                CommandOutput::Edge(self.add_edge(spec, force)?)
            }
            GraphCommand::RemoveEdge {
                src,
                src_attr,
                dest,
                dest_attr,
            } => {
                let key = self.resolve_key(&src, &src_attr, &dest, &dest_attr)?;
                self.remove_edge(&key)?;
                CommandOutput::RemovedEdges(vec![key])
            }
            GraphCommand::RemoveEdgesBetween { src, dest } => {
                let removed = self.remove_edges_between(self.resolve(&src)?, self.resolve(&dest)?)?;
                CommandOutput::RemovedEdges(removed.iter().map(|e| e.key()).collect())
            }
            GraphCommand::SplitEdge {
                src,
                src_attr,
                dest,
                dest_attr,
                pos,
            } => {
                let key = self.resolve_key(&src, &src_attr, &dest, &dest_attr)?;
                CommandOutput::Node(self.split_edge(&key, pos)?)
            }
            GraphCommand::PopNode { node } => {
                CommandOutput::Popped(self.pop_node(self.resolve(&node)?)?)
            }
            GraphCommand::RenameNode { node, name } => {
                CommandOutput::Renamed(self.rename_node(self.resolve(&node)?, &name)?)
            }
            GraphCommand::SetPosition { node, pos } => {
                let id = self.resolve(&node)?;
                self.set_position(id, pos)?;
                CommandOutput::Moved(vec![id])
            }
            GraphCommand::MoveBy {
                node,
                delta,
                downstream,
            } => CommandOutput::Moved(self.move_by(self.resolve(&node)?, delta, downstream)?),
            GraphCommand::SetColor { node, color } => {
                self.set_color(self.resolve(&node)?, color)?;
                CommandOutput::Done
            }
            GraphCommand::SetEnabled { node, enabled } => {
                self.set_enabled(self.resolve(&node)?, enabled)?;
                CommandOutput::Done
            }
            GraphCommand::SetAttribute {
                node,
                attribute,
                value,
            } => {
                self.set_attribute(self.resolve(&node)?, &attribute, value)?;
                CommandOutput::Done
            }
            GraphCommand::AddAttribute {
                node,
                attribute,
                value,
                props,
            } => {
                self.add_attribute(self.resolve(&node)?, &attribute, value, props)?;
                CommandOutput::Done
            }
            GraphCommand::RenameAttribute { node, old, new } => {
                self.rename_attribute(self.resolve(&node)?, &old, &new)?;
                CommandOutput::Done
            }
            GraphCommand::RemoveAttribute { node, attribute } => {
                self.remove_attribute(self.resolve(&node)?, &attribute)?;
                CommandOutput::Done
            }
        };
        Ok(output)
    }

    /// Runs a list of commands as one transaction: if any command fails,
    /// none of them take effect.
    pub fn apply_all(
        &mut self,
        commands: impl IntoIterator<Item = GraphCommand>,
    ) -> Result<Vec<CommandOutput>> {
        self.transaction(|g| commands.into_iter().map(|c| g.apply(c)).collect())
    }
}
