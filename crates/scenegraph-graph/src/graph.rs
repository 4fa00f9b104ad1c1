//! The scene graph and its mutation engine.
//!
//! [`Graph`] stores nodes and edges in a petgraph `StableDiGraph`, with a
//! `NodeId → NodeIndex` lookup so callers only ever deal in stable ids.
//! Every mutation validates first and changes state second, so a failed
//! call leaves the graph untouched. Multi-step operations
//! ([`split_edge`](Graph::split_edge), [`pop_node`](Graph::pop_node)) run
//! inside a [`transaction`](Graph::transaction) and roll back as a whole.
//!
//! # Example
//!
//! ```rust
//! use scenegraph_graph::{EdgeSpec, Graph, NodeOptions};
//!
//! let mut graph = Graph::new();
//! let a = graph.add_node("asset", NodeOptions::at([0.0, 0.0])).unwrap();
//! let b = graph.add_node("asset", NodeOptions::at([200.0, 0.0])).unwrap();
//! let key = graph.add_edge(EdgeSpec::new(a, "output", b, "input"), false).unwrap();
//!
//! let dot = graph.split_edge(&key, [100.0, 0.0]).unwrap();
//! assert_eq!(graph.downstream(a).unwrap(), vec![dot, b]);
//! ```

use crate::attribute::{Attribute, AttributeProps};
use crate::config::GraphConfig;
use crate::edge::{Edge, EdgeKey, EdgeSpec};
use crate::event::GraphEvent;
use crate::node::{INPUT_PORT, NameRegistry, NameTable, Node, OUTPUT_PORT};
use crate::registry::NodeTypeRegistry;
use indexmap::IndexMap;
use log::{debug, warn};
use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use scenegraph_core::{Error, NodeId, Result, Value};
use scenegraph_template::ConnectionType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Node type inserted by [`Graph::split_edge`].
pub const DOT_NODE_TYPE: &str = "dot";

// ============================================================================
// NodeOptions
// ============================================================================

/// Optional settings for [`Graph::add_node`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    /// Requested name; defaults to the type's default name.
    pub name: Option<String>,
    /// Initial position.
    pub pos: [f64; 2],
    /// Color override.
    pub color: Option<[u8; 4]>,
    /// Attribute values; unknown names become user attributes.
    pub attributes: IndexMap<String, Value>,
}

impl NodeOptions {
    /// Options with everything defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options placing the node at `pos`.
    pub fn at(pos: [f64; 2]) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }

    /// Sets the requested name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the color.
    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets an attribute value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Result of [`Graph::evaluate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Every node in dependency order.
    pub order: Vec<NodeId>,
    /// Nodes that reported themselves disabled.
    pub disabled: Vec<NodeId>,
}

// ============================================================================
// Graph
// ============================================================================

/// A directed graph of typed nodes joined port to port.
#[derive(Clone, Debug)]
pub struct Graph {
    graph: StableDiGraph<Node, Edge>,
    index: HashMap<NodeId, NodeIndex>,
    names: NameTable,
    registry: Arc<NodeTypeRegistry>,
    config: GraphConfig,
    events: Vec<GraphEvent>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates an empty graph with the built-in node types.
    pub fn new() -> Self {
        Self::with_registry(
            Arc::new(NodeTypeRegistry::with_builtins()),
            GraphConfig::default(),
        )
    }

    /// Creates an empty graph using `registry` and `config`.
    pub fn with_registry(registry: Arc<NodeTypeRegistry>, config: GraphConfig) -> Self {
        Self {
            graph: StableDiGraph::new(),
            index: HashMap::new(),
            names: NameTable::new(),
            registry,
            config,
            events: Vec::new(),
        }
    }

    /// Creates an empty graph, building the registry from `config`
    /// (built-ins plus configured template directories).
    pub fn from_config(config: GraphConfig) -> Result<Self> {
        let registry = NodeTypeRegistry::from_config(&config)?;
        Ok(Self::with_registry(Arc::new(registry), config))
    }

    /// Active configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Node type registry.
    pub fn registry(&self) -> &Arc<NodeTypeRegistry> {
        &self.registry
    }

    /// Runs `f` against the graph; if it fails, every change it made
    /// (including queued events) is discarded.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Graph) -> Result<T>) -> Result<T> {
        let backup = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!("Rolling back graph transaction: {e}");
                *self = backup;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Events queued since the last drain.
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Takes every queued event.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: GraphEvent) {
        self.events.push(event);
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    fn idx(&self, id: NodeId) -> Result<NodeIndex> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| Error::node_not_found(id))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns whether a node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        Ok(&self.graph[self.idx(id)?])
    }

    /// Looks up a node by display name.
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        let id = self.names.lookup(name)?;
        self.node(id).ok()
    }

    /// All nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(|i| &self.graph[i])
    }

    /// All node ids, sorted by node name.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.sorted_by_name(self.graph.node_indices())
    }

    /// All edges, in no particular order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_indices().map(|e| &self.graph[e])
    }

    fn find_edge(&self, key: &EdgeKey) -> Option<EdgeIndex> {
        let src = *self.index.get(&key.src_id)?;
        let dest = *self.index.get(&key.dest_id)?;
        self.graph
            .edges_directed(src, Direction::Outgoing)
            .find(|e| e.target() == dest && e.weight().matches(key))
            .map(|e| e.id())
    }

    /// Returns whether an edge exists.
    pub fn has_edge(&self, key: &EdgeKey) -> bool {
        self.find_edge(key).is_some()
    }

    /// Looks up an edge.
    pub fn edge(&self, key: &EdgeKey) -> Result<&Edge> {
        self.find_edge(key)
            .map(|e| &self.graph[e])
            .ok_or_else(|| Error::EdgeNotFound {
                edge: self.describe(key),
            })
    }

    /// Human-readable `src.attr -> dest.attr` using node names when known.
    pub fn describe(&self, key: &EdgeKey) -> String {
        let name = |id: NodeId| {
            self.node(id)
                .map(|n| n.name().to_string())
                .unwrap_or_else(|_| id.to_string())
        };
        format!(
            "{}.{} -> {}.{}",
            name(key.src_id),
            key.src_attr,
            name(key.dest_id),
            key.dest_attr
        )
    }

    fn sorted_by_name(&self, indices: impl Iterator<Item = NodeIndex>) -> Vec<NodeId> {
        let mut nodes: Vec<&Node> = indices.map(|i| &self.graph[i]).collect();
        nodes.sort_by(|a, b| a.name().cmp(b.name()));
        nodes.into_iter().map(Node::id).collect()
    }

    /// Edges touching `idx` in one direction, ordered by local port, then
    /// by the far node's name and port.
    fn directed_edges(&self, idx: NodeIndex, dir: Direction) -> Vec<(EdgeIndex, &Edge)> {
        let mut edges: Vec<(EdgeIndex, &Edge)> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| (e.id(), e.weight()))
            .collect();
        let sort_key = |edge: &Edge| {
            let (local, far, far_port) = match dir {
                Direction::Incoming => (&edge.dest_attr, edge.src_id, &edge.src_attr),
                Direction::Outgoing => (&edge.src_attr, edge.dest_id, &edge.dest_attr),
            };
            let far_name = self.node(far).map(Node::name).unwrap_or_default();
            (local.clone(), far_name.to_string(), far_port.clone())
        };
        edges.sort_by_cached_key(|(_, edge)| sort_key(edge));
        edges
    }

    /// Edges arriving at a node.
    pub fn incoming_edges(&self, id: NodeId) -> Result<Vec<&Edge>> {
        let idx = self.idx(id)?;
        Ok(self
            .directed_edges(idx, Direction::Incoming)
            .into_iter()
            .map(|(_, e)| e)
            .collect())
    }

    /// Edges leaving a node.
    pub fn outgoing_edges(&self, id: NodeId) -> Result<Vec<&Edge>> {
        let idx = self.idx(id)?;
        Ok(self
            .directed_edges(idx, Direction::Outgoing)
            .into_iter()
            .map(|(_, e)| e)
            .collect())
    }

    /// Edges attached to one port.
    pub fn port_edges(&self, id: NodeId, port: &str) -> Result<Vec<&Edge>> {
        let idx = self.idx(id)?;
        let attr = self.graph[idx].port(port)?;
        let dir = if attr.is_input() {
            Direction::Incoming
        } else {
            Direction::Outgoing
        };
        Ok(self
            .directed_edges(idx, dir)
            .into_iter()
            .map(|(_, e)| e)
            .filter(|e| match dir {
                Direction::Incoming => e.dest_attr == port,
                Direction::Outgoing => e.src_attr == port,
            })
            .collect())
    }

    fn port_edge_indices(&self, idx: NodeIndex, port: &str, dir: Direction) -> Vec<EdgeIndex> {
        self.graph
            .edges_directed(idx, dir)
            .filter(|e| match dir {
                Direction::Incoming => e.weight().dest_attr == port,
                Direction::Outgoing => e.weight().src_attr == port,
            })
            .map(|e| e.id())
            .collect()
    }

    fn neighbors(&self, id: NodeId, dir: Direction) -> Result<Vec<NodeId>> {
        let idx = self.idx(id)?;
        let mut seen = HashSet::new();
        Ok(self
            .directed_edges(idx, dir)
            .into_iter()
            .map(|(_, e)| match dir {
                Direction::Incoming => e.src_id,
                Direction::Outgoing => e.dest_id,
            })
            .filter(|id| seen.insert(*id))
            .collect())
    }

    /// Distinct nodes feeding into `id`.
    pub fn input_nodes(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Distinct nodes fed by `id`.
    pub fn output_nodes(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Nodes without incoming edges, sorted by name.
    pub fn roots(&self) -> Vec<NodeId> {
        self.sorted_by_name(self.graph.node_indices().filter(|&i| {
            self.graph
                .neighbors_directed(i, Direction::Incoming)
                .next()
                .is_none()
        }))
    }

    /// Nodes without outgoing edges, sorted by name.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.sorted_by_name(self.graph.node_indices().filter(|&i| {
            self.graph
                .neighbors_directed(i, Direction::Outgoing)
                .next()
                .is_none()
        }))
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    fn reachable(&self, id: NodeId, dir: Direction) -> Result<Vec<NodeId>> {
        let start = self.idx(id)?;
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for (_, edge) in self.directed_edges(current, dir) {
                let next_id = match dir {
                    Direction::Incoming => edge.src_id,
                    Direction::Outgoing => edge.dest_id,
                };
                let next = self.idx(next_id)?;
                if visited.insert(next) {
                    out.push(next_id);
                    queue.push_back(next);
                }
            }
        }
        Ok(out)
    }

    /// Every node reachable from `id` along edges, breadth first. The start
    /// node is excluded.
    pub fn downstream(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.reachable(id, Direction::Outgoing)
    }

    /// Every node that reaches `id`, breadth first. The start node is
    /// excluded.
    pub fn upstream(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.reachable(id, Direction::Incoming)
    }

    /// Node ids in dependency order.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|i| self.graph[i].id()).collect())
            .map_err(|cycle| Error::CycleDetected {
                edge: format!("through node {}", self.graph[cycle.node_id()].name()),
            })
    }

    /// Visits every node in dependency order and collects the ones that
    /// are disabled.
    pub fn evaluate(&self) -> Result<Evaluation> {
        let order = self.topological_order()?;
        let mut disabled = Vec::new();
        for &id in &order {
            let node = self.node(id)?;
            if !node.evaluate() {
                debug!("Skipping disabled node {}", node.name());
                disabled.push(id);
            }
        }
        Ok(Evaluation { order, disabled })
    }

    // ------------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------------

    /// Adds a node of a registered type.
    ///
    /// The node gets a fresh id, its template's attributes (overridden by
    /// `options.attributes`), and a unique name derived from the requested
    /// one.
    pub fn add_node(&mut self, node_type: &str, options: NodeOptions) -> Result<NodeId> {
        let registry = Arc::clone(&self.registry);
        let spec = registry.get(node_type)?;

        let mut id = NodeId::new();
        while self.index.contains_key(&id) {
            id = NodeId::new();
        }
        let mut node = Node::new(id, spec);
        node.set_pos(options.pos);
        if let Some(color) = options.color {
            node.set_color(color);
        }
        for (name, value) in options.attributes {
            if node.has_attribute(&name) {
                node.set(&name, value)?;
            } else {
                node.add_attribute(&name, value, AttributeProps::new())?;
            }
        }

        let requested = options.name.unwrap_or_else(|| spec.default_name.clone());
        node.rename(&requested, &mut self.names);
        debug!("Adding {node_type} node {} ({id})", node.name());

        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        self.events.push(GraphEvent::NodeAdded { id });
        Ok(id)
    }

    /// Inserts a fully built node, keeping its id and name.
    pub(crate) fn insert_node(&mut self, mut node: Node) -> Result<()> {
        let id = node.id();
        if self.index.contains_key(&id) {
            return Err(Error::invalid_snapshot(format!("duplicate node id {id}")));
        }
        let wanted = node.name().to_string();
        let granted = self.names.claim(id, &wanted);
        if granted != wanted {
            self.names.release(id);
            return Err(Error::invalid_snapshot(format!(
                "node name {wanted:?} is not unique or not valid"
            )));
        }
        node.restore_identity(granted);
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        self.events.push(GraphEvent::NodeAdded { id });
        Ok(())
    }

    /// Removes a node and every edge attached to it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node> {
        let idx = self.idx(id)?;
        let attached: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .chain(self.graph.edges_directed(idx, Direction::Outgoing))
            .map(|e| e.id())
            .collect();
        for edge in attached {
            self.remove_edge_at(edge);
        }
        let node = self
            .graph
            .remove_node(idx)
            .ok_or_else(|| Error::node_not_found(id))?;
        self.index.remove(&id);
        self.names.release(id);
        debug!("Removed node {} ({id})", node.name());
        self.events.push(GraphEvent::NodeRemoved { id });
        Ok(node)
    }

    fn update_node<T>(
        &mut self,
        id: NodeId,
        field: &str,
        f: impl FnOnce(&mut Node) -> Result<T>,
    ) -> Result<T> {
        let idx = self.idx(id)?;
        let out = f(&mut self.graph[idx])?;
        self.events.push(GraphEvent::NodeChanged {
            id,
            field: field.to_string(),
        });
        Ok(out)
    }

    /// Renames a node, returning the name actually granted.
    pub fn rename_node(&mut self, id: NodeId, name: &str) -> Result<String> {
        let idx = self.idx(id)?;
        let granted = self.graph[idx].rename(name, &mut self.names).to_string();
        self.events.push(GraphEvent::NodeChanged {
            id,
            field: "name".to_string(),
        });
        Ok(granted)
    }

    /// Moves a node.
    pub fn set_position(&mut self, id: NodeId, pos: [f64; 2]) -> Result<()> {
        self.update_node(id, "pos", |node| {
            node.set_pos(pos);
            Ok(())
        })
    }

    /// Moves a node by `delta`; with `move_downstream`, everything
    /// downstream of it moves too. Returns the nodes moved.
    pub fn move_by(
        &mut self,
        id: NodeId,
        delta: [f64; 2],
        move_downstream: bool,
    ) -> Result<Vec<NodeId>> {
        let mut moved = vec![id];
        if move_downstream {
            moved.extend(self.downstream(id)?);
        }
        for &node_id in &moved {
            self.update_node(node_id, "pos", |node| {
                let [x, y] = node.pos();
                node.set_pos([x + delta[0], y + delta[1]]);
                Ok(())
            })?;
        }
        Ok(moved)
    }

    /// Sets a node's color.
    pub fn set_color(&mut self, id: NodeId, color: [u8; 4]) -> Result<()> {
        self.update_node(id, "color", |node| {
            node.set_color(color);
            Ok(())
        })
    }

    /// Enables or disables a node.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<()> {
        self.update_node(id, "enabled", |node| {
            node.set_enabled(enabled);
            Ok(())
        })
    }

    /// Forces a node to draw expanded.
    pub fn set_force_expand(&mut self, id: NodeId, force: bool) -> Result<()> {
        self.update_node(id, "force_expand", |node| {
            node.set_force_expand(force);
            Ok(())
        })
    }

    /// Sets a node's docstring.
    pub fn set_docstring(&mut self, id: NodeId, doc: &str) -> Result<()> {
        self.update_node(id, "docstring", |node| {
            node.set_docstring(doc);
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    /// Sets an attribute value.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<Value>) -> Result<()> {
        self.update_node(id, name, |node| node.set(name, value))
    }

    /// Adds an attribute to a node.
    pub fn add_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<Value>,
        props: AttributeProps,
    ) -> Result<()> {
        self.update_node(id, name, |node| {
            node.add_attribute(name, value, props).map(|_| ())
        })
    }

    /// Looks up an attribute, creating an empty user attribute when absent.
    pub fn attribute_or_insert(&mut self, id: NodeId, name: &str) -> Result<&Attribute> {
        let idx = self.idx(id)?;
        if !self.graph[idx].has_attribute(name) {
            self.add_attribute(id, name, Value::Null, AttributeProps::new())?;
        }
        self.graph[idx].attribute(name)
    }

    fn ensure_port_free(&self, idx: NodeIndex, name: &str) -> Result<()> {
        let node = &self.graph[idx];
        let in_use = match node.attribute(name) {
            Ok(attr) if attr.is_input() => {
                !self.port_edge_indices(idx, name, Direction::Incoming).is_empty()
            }
            Ok(attr) if attr.is_output() => {
                !self.port_edge_indices(idx, name, Direction::Outgoing).is_empty()
            }
            _ => false,
        };
        if in_use {
            return Err(Error::PortInUse {
                node: node.name().to_string(),
                port: name.to_string(),
            });
        }
        Ok(())
    }

    /// Renames an attribute. Ports with edges cannot be renamed.
    pub fn rename_attribute(&mut self, id: NodeId, old: &str, new: &str) -> Result<()> {
        let idx = self.idx(id)?;
        self.ensure_port_free(idx, old)?;
        self.update_node(id, new, |node| node.rename_attribute(old, new))
    }

    /// Removes an attribute. Ports with edges cannot be removed.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Attribute> {
        let idx = self.idx(id)?;
        self.ensure_port_free(idx, name)?;
        self.update_node(id, name, |node| node.remove_attribute(name))
    }

    // ------------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------------

    fn port_for<'a>(node: &'a Node, name: &str, expected: ConnectionType) -> Result<&'a Attribute> {
        let attr = node
            .attribute(name)
            .map_err(|_| Error::port_not_found(node.name(), name))?;
        if !attr.connectable {
            return Err(Error::NotConnectable {
                node: node.name().to_string(),
                attribute: name.to_string(),
            });
        }
        if attr.connection_type != Some(expected) {
            return Err(Error::InvalidDirection {
                node: node.name().to_string(),
                port: name.to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(attr)
    }

    /// Connects an output port to an input port.
    ///
    /// When the destination port is full, `force` evicts its existing
    /// edges first; otherwise the call fails with `CapacityExceeded`.
    /// Source capacity is never forced.
    pub fn add_edge(&mut self, spec: EdgeSpec, force: bool) -> Result<EdgeKey> {
        let src_idx = self.idx(spec.src)?;
        let dest_idx = self.idx(spec.dest)?;
        let key = spec.key();

        let src = &self.graph[src_idx];
        let dest = &self.graph[dest_idx];
        if spec.src == spec.dest {
            return Err(Error::SelfLoop {
                node: src.name().to_string(),
            });
        }
        let src_max = Self::port_for(src, &spec.src_attr, ConnectionType::Output)?.max_connections;
        let dest_max = Self::port_for(dest, &spec.dest_attr, ConnectionType::Input)?.max_connections;

        if self.find_edge(&key).is_some() {
            return Err(Error::DuplicateEdge {
                edge: self.describe(&key),
            });
        }

        let src_edges = self.port_edge_indices(src_idx, &spec.src_attr, Direction::Outgoing);
        if src_max > 0 && src_edges.len() >= src_max {
            return Err(Error::capacity(src.name(), &spec.src_attr, src_max));
        }

        let dest_edges = self.port_edge_indices(dest_idx, &spec.dest_attr, Direction::Incoming);
        let evict = if dest_max > 0 && dest_edges.len() >= dest_max {
            if !force {
                return Err(Error::capacity(dest.name(), &spec.dest_attr, dest_max));
            }
            dest_edges
        } else {
            Vec::new()
        };

        if !self.config.allow_cycles && has_path_connecting(&self.graph, dest_idx, src_idx, None)
        {
            return Err(Error::CycleDetected {
                edge: self.describe(&key),
            });
        }

        for edge in evict {
            if let Some(removed) = self.remove_edge_at(edge) {
                warn!("Evicted edge {}", self.describe(&removed.key()));
            }
        }
        debug!("Adding edge {}", self.describe(&key));
        self.graph.add_edge(src_idx, dest_idx, spec.into_edge());
        self.events.push(GraphEvent::EdgeAdded { edge: key.clone() });
        Ok(key)
    }

    fn remove_edge_at(&mut self, edge: EdgeIndex) -> Option<Edge> {
        let removed = self.graph.remove_edge(edge)?;
        self.events.push(GraphEvent::EdgeRemoved {
            edge: removed.key(),
        });
        Some(removed)
    }

    /// Removes one edge.
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Result<Edge> {
        let edge = self.find_edge(key).ok_or_else(|| Error::EdgeNotFound {
            edge: self.describe(key),
        })?;
        self.remove_edge_at(edge).ok_or_else(|| Error::EdgeNotFound {
            edge: self.describe(key),
        })
    }

    /// Removes every edge from `src` to `dest`, whatever the ports.
    pub fn remove_edges_between(&mut self, src: NodeId, dest: NodeId) -> Result<Vec<Edge>> {
        let src_idx = self.idx(src)?;
        let dest_idx = self.idx(dest)?;
        let edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(src_idx, Direction::Outgoing)
            .filter(|e| e.target() == dest_idx)
            .map(|e| e.id())
            .collect();
        Ok(edges
            .into_iter()
            .filter_map(|e| self.remove_edge_at(e))
            .collect())
    }

    // ------------------------------------------------------------------------
    // Compound operations
    // ------------------------------------------------------------------------

    /// Replaces an edge with a dot node at `pos` and two edges through it.
    /// Returns the dot node's id. Nothing changes if any step fails.
    pub fn split_edge(&mut self, key: &EdgeKey, pos: [f64; 2]) -> Result<NodeId> {
        self.transaction(|g| {
            let edge = g.remove_edge(key)?;
            let dot = g.add_node(DOT_NODE_TYPE, NodeOptions::at(pos))?;
            g.add_edge(
                EdgeSpec::new(edge.src_id, edge.src_attr.clone(), dot, INPUT_PORT)
                    .with_weight(edge.weight)
                    .with_style(edge.style),
                false,
            )?;
            g.add_edge(
                EdgeSpec::new(dot, OUTPUT_PORT, edge.dest_id, edge.dest_attr.clone())
                    .with_weight(edge.weight)
                    .with_style(edge.style),
                false,
            )?;
            Ok(dot)
        })
    }

    /// Detaches a node from all its edges.
    ///
    /// When the node had exactly one upstream and one downstream neighbour,
    /// those two are connected directly, port to port, and the new edge's
    /// key is returned. The node itself stays in the graph.
    pub fn pop_node(&mut self, id: NodeId) -> Result<Option<EdgeKey>> {
        self.transaction(|g| {
            let idx = g.idx(id)?;
            let incoming = g.directed_edges(idx, Direction::Incoming);
            let outgoing = g.directed_edges(idx, Direction::Outgoing);
            let preds: HashSet<NodeId> = incoming.iter().map(|(_, e)| e.src_id).collect();
            let succs: HashSet<NodeId> = outgoing.iter().map(|(_, e)| e.dest_id).collect();

            let reconnect = match (incoming.first(), outgoing.first()) {
                (Some((_, inbound)), Some((_, outbound)))
                    if preds.len() == 1 && succs.len() == 1 && inbound.src_id != outbound.dest_id =>
                {
                    Some(
                        EdgeSpec::new(
                            inbound.src_id,
                            inbound.src_attr.clone(),
                            outbound.dest_id,
                            outbound.dest_attr.clone(),
                        )
                        .with_weight(inbound.weight)
                        .with_style(inbound.style),
                    )
                }
                _ => None,
            };
            let detach: Vec<EdgeIndex> = incoming
                .iter()
                .chain(outgoing.iter())
                .map(|(e, _)| *e)
                .collect();

            for edge in detach {
                g.remove_edge_at(edge);
            }
            match reconnect {
                Some(spec) if g.has_edge(&spec.key()) => Ok(None),
                Some(spec) => g.add_edge(spec, false).map(Some),
                None => Ok(None),
            }
        })
    }

    // ------------------------------------------------------------------------
    // Restore support
    // ------------------------------------------------------------------------

    pub(crate) fn empty_like(&self) -> Graph {
        Graph::with_registry(Arc::clone(&self.registry), self.config.clone())
    }

    pub(crate) fn replace_state(&mut self, other: Graph) {
        self.graph = other.graph;
        self.index = other.index;
        self.names = other.names;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::edge::EdgeStyle;

    fn chain(graph: &mut Graph, names: &[&str]) -> Vec<NodeId> {
        let ids: Vec<NodeId> = names
            .iter()
            .map(|n| graph.add_node("default", NodeOptions::new().with_name(*n)).unwrap())
            .collect();
        for pair in ids.windows(2) {
            graph
                .add_edge(EdgeSpec::new(pair[0], "output", pair[1], "input"), false)
                .unwrap();
        }
        ids
    }

    // ------------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------------

    #[test]
    fn test_add_node_defaults() {
        let mut graph = Graph::new();
        let id = graph.add_node("default", NodeOptions::at([0.0, 0.0])).unwrap();
        let node = graph.node(id).unwrap();
        assert_eq!(node.name(), "node");
        assert_eq!(node.color(), [172, 172, 172, 255]);
        assert_eq!(node.pos(), [0.0, 0.0]);
        assert_eq!(graph.drain_events(), vec![GraphEvent::NodeAdded { id }]);
        assert!(graph.events().is_empty());
    }

    #[test]
    fn test_add_node_unique_names() {
        let mut graph = Graph::new();
        let a = graph.add_node("dot", NodeOptions::new()).unwrap();
        let b = graph.add_node("dot", NodeOptions::new()).unwrap();
        let c = graph.add_node("dot", NodeOptions::new().with_name("dot")).unwrap();
        assert_eq!(graph.node(a).unwrap().name(), "dot");
        assert_eq!(graph.node(b).unwrap().name(), "dot1");
        assert_eq!(graph.node(c).unwrap().name(), "dot2");
        assert_eq!(graph.node_by_name("dot1").unwrap().id(), b);
    }

    #[test]
    fn test_add_node_attribute_overrides() {
        let mut graph = Graph::new();
        let id = graph
            .add_node(
                "asset",
                NodeOptions::new()
                    .with_attribute("version", 4)
                    .with_attribute("shot", "010")
                    .with_color([1, 2, 3, 255]),
            )
            .unwrap();
        let node = graph.node(id).unwrap();
        assert_eq!(node.get("version").unwrap(), &Value::Int(4));
        assert_eq!(node.get("shot").unwrap(), &Value::from("010"));
        assert!(node.attribute("shot").unwrap().user);
        assert_eq!(node.color(), [1, 2, 3, 255]);
    }

    #[test]
    fn test_add_node_failure_leaves_graph_untouched() {
        let mut graph = Graph::new();
        assert!(matches!(
            graph.add_node("camera", NodeOptions::new()),
            Err(Error::UnknownNodeType { .. })
        ));
        assert!(graph
            .add_node("asset", NodeOptions::new().with_attribute("version", "x"))
            .is_err());
        assert!(graph.is_empty());
        assert!(graph.events().is_empty());
        let id = graph.add_node("asset", NodeOptions::new()).unwrap();
        assert_eq!(graph.node(id).unwrap().name(), "asset");
    }

    #[test]
    fn test_remove_node_removes_edges_and_name() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b", "c"]);
        graph.drain_events();
        graph.remove_node(ids[1]).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node_by_name("b").is_none());
        let events = graph.drain_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], GraphEvent::NodeRemoved { id: ids[1] });
        assert!(matches!(
            graph.remove_node(ids[1]),
            Err(Error::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_rename_node() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b"]);
        assert_eq!(graph.rename_node(ids[1], "a").unwrap(), "a1");
        assert_eq!(graph.rename_node(ids[0], "hero plate").unwrap(), "hero_plate");
        assert!(graph.node_by_name("a").is_none());
    }

    #[test]
    fn test_move_by_downstream() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b", "c"]);
        let moved = graph.move_by(ids[1], [10.0, 5.0], true).unwrap();
        assert_eq!(moved, vec![ids[1], ids[2]]);
        assert_eq!(graph.node(ids[0]).unwrap().pos(), [0.0, 0.0]);
        assert_eq!(graph.node(ids[2]).unwrap().pos(), [10.0, 5.0]);
    }

    #[test]
    fn test_node_setters_emit_events() {
        let mut graph = Graph::new();
        let id = graph.add_node("default", NodeOptions::new()).unwrap();
        graph.drain_events();
        graph.set_color(id, [0, 0, 0, 255]).unwrap();
        graph.set_enabled(id, false).unwrap();
        graph.set_position(id, [1.0, 2.0]).unwrap();
        let fields: Vec<String> = graph
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GraphEvent::NodeChanged { field, .. } => Some(field),
                _ => None,
            })
            .collect();
        assert_eq!(fields, vec!["color", "enabled", "pos"]);
        assert!(!graph.node(id).unwrap().enabled());
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    #[test]
    fn test_set_attribute_through_graph() {
        let mut graph = Graph::new();
        let id = graph.add_node("asset", NodeOptions::new()).unwrap();
        graph.set_attribute(id, "filename", "/show/a.exr").unwrap();
        assert_eq!(
            graph.node(id).unwrap().get("filename").unwrap(),
            &Value::from("/show/a.exr")
        );
        assert!(matches!(
            graph.set_attribute(id, "filename", 3),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_port_in_use_blocks_rename_and_remove() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b"]);
        assert!(matches!(
            graph.rename_attribute(ids[1], "input", "src"),
            Err(Error::PortInUse { .. })
        ));
        assert!(matches!(
            graph.remove_attribute(ids[0], "output"),
            Err(Error::PortInUse { .. })
        ));
        graph.remove_attribute(ids[1], "output").unwrap();
        assert!(!graph.node(ids[1]).unwrap().has_attribute("output"));
    }

    #[test]
    fn test_attribute_or_insert_through_graph() {
        let mut graph = Graph::new();
        let id = graph.add_node("default", NodeOptions::new()).unwrap();
        let attr = graph.attribute_or_insert(id, "comment").unwrap();
        assert!(attr.value.is_null());
        assert!(graph.node(id).unwrap().has_attribute("comment"));
    }

    // ------------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------------

    #[test]
    fn test_add_edge_validation() {
        let mut graph = Graph::new();
        let a = graph.add_node("asset", NodeOptions::new()).unwrap();
        let b = graph.add_node("asset", NodeOptions::new()).unwrap();
        let note = graph.add_node("note", NodeOptions::new()).unwrap();

        let cases = [
            (EdgeSpec::new(a, "output", a, "input"), "self"),
            (EdgeSpec::new(a, "missing", b, "input"), "port"),
            (EdgeSpec::new(a, "version", b, "input"), "connectable"),
            (EdgeSpec::new(a, "input", b, "input"), "direction"),
            (EdgeSpec::new(a, "output", b, "output"), "direction"),
            (EdgeSpec::new(a, "output", note, "doc_text"), "connectable"),
            (EdgeSpec::new(a, "output", NodeId::new(), "input"), "node"),
        ];
        for (spec, kind) in cases {
            let err = graph.add_edge(spec, false).unwrap_err();
            let ok = match kind {
                "self" => matches!(err, Error::SelfLoop { .. }),
                "port" => matches!(err, Error::PortNotFound { .. }),
                "connectable" => matches!(err, Error::NotConnectable { .. }),
                "direction" => matches!(err, Error::InvalidDirection { .. }),
                "node" => matches!(err, Error::NodeNotFound { .. }),
                _ => false,
            };
            assert!(ok, "expected {kind} error, got {err}");
        }
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b"]);
        assert!(matches!(
            graph.add_edge(EdgeSpec::new(ids[0], "output", ids[1], "input"), true),
            Err(Error::DuplicateEdge { .. })
        ));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_source_capacity_is_never_forced() {
        let mut graph = Graph::new();
        let a = graph.add_node("default", NodeOptions::new()).unwrap();
        graph
            .add_attribute(
                a,
                "single",
                Value::Null,
                AttributeProps::new().output().with_max_connections(1),
            )
            .unwrap();
        let b = graph.add_node("default", NodeOptions::new()).unwrap();
        let c = graph.add_node("default", NodeOptions::new()).unwrap();
        graph.add_edge(EdgeSpec::new(a, "single", b, "input"), false).unwrap();
        assert!(matches!(
            graph.add_edge(EdgeSpec::new(a, "single", c, "input"), true),
            Err(Error::CapacityExceeded { max: 1, .. })
        ));
    }

    #[test]
    fn test_cycle_rejected_by_default() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b", "c"]);
        graph
            .add_attribute(ids[0], "feedback", Value::Null, AttributeProps::new().input())
            .unwrap();
        assert!(matches!(
            graph.add_edge(EdgeSpec::new(ids[2], "output", ids[0], "feedback"), false),
            Err(Error::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_cycle_allowed_when_configured() {
        let mut graph = Graph::with_registry(
            Arc::new(NodeTypeRegistry::with_builtins()),
            GraphConfig::default().with_allow_cycles(true),
        );
        let ids = chain(&mut graph, &["a", "b"]);
        graph
            .add_attribute(ids[0], "feedback", Value::Null, AttributeProps::new().input())
            .unwrap();
        graph
            .add_edge(EdgeSpec::new(ids[1], "output", ids[0], "feedback"), false)
            .unwrap();
        // traversal terminates on the cycle
        assert_eq!(graph.downstream(ids[0]).unwrap(), vec![ids[1]]);
        assert_eq!(graph.upstream(ids[0]).unwrap(), vec![ids[1]]);
        assert!(matches!(
            graph.topological_order(),
            Err(Error::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_remove_edge_and_between() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b"]);
        let key = EdgeKey::new(ids[0], "output", ids[1], "input");
        assert!(graph.has_edge(&key));
        graph.remove_edge(&key).unwrap();
        assert!(matches!(
            graph.remove_edge(&key),
            Err(Error::EdgeNotFound { .. })
        ));

        graph
            .add_edge(EdgeSpec::new(ids[0], "output", ids[1], "input"), false)
            .unwrap();
        let removed = graph.remove_edges_between(ids[0], ids[1]).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(graph.remove_edges_between(ids[0], ids[1]).unwrap().is_empty());
    }

    #[test]
    fn test_describe_uses_names() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["plate", "grade"]);
        let key = EdgeKey::new(ids[0], "output", ids[1], "input");
        assert_eq!(graph.describe(&key), "plate.output -> grade.input");
    }

    // ------------------------------------------------------------------------
    // Compound operations
    // ------------------------------------------------------------------------

    #[test]
    fn test_split_edge_carries_weight_and_style() {
        let mut graph = Graph::new();
        let a = graph.add_node("default", NodeOptions::new()).unwrap();
        let b = graph.add_node("default", NodeOptions::new()).unwrap();
        let key = graph
            .add_edge(
                EdgeSpec::new(a, "output", b, "input")
                    .with_weight(0.25)
                    .with_style(EdgeStyle::Straight),
                false,
            )
            .unwrap();
        let dot = graph.split_edge(&key, [5.0, 5.0]).unwrap();
        let into_dot = graph.edge(&EdgeKey::new(a, "output", dot, "input")).unwrap();
        assert_eq!(into_dot.weight, 0.25);
        assert_eq!(into_dot.style, EdgeStyle::Straight);
        assert_eq!(graph.node(dot).unwrap().pos(), [5.0, 5.0]);
    }

    #[test]
    fn test_split_edge_rolls_back_on_failure() {
        let mut registry = NodeTypeRegistry::with_builtins();
        registry.register(crate::registry::NodeTypeSpec::new(
            DOT_NODE_TYPE,
            crate::node::NodeKind::Dot,
        ));
        let mut graph = Graph::with_registry(Arc::new(registry), GraphConfig::default());
        let ids = chain(&mut graph, &["a", "b"]);
        graph.drain_events();
        let key = EdgeKey::new(ids[0], "output", ids[1], "input");

        // the replacement dot type has no ports, so wiring it fails
        assert!(matches!(
            graph.split_edge(&key, [0.0, 0.0]),
            Err(Error::PortNotFound { .. })
        ));
        assert!(graph.has_edge(&key));
        assert_eq!(graph.node_count(), 2);
        assert!(graph.node_by_name("dot").is_none());
        assert!(graph.events().is_empty());
    }

    #[test]
    fn test_split_missing_edge() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b"]);
        let key = EdgeKey::new(ids[1], "output", ids[0], "input");
        assert!(matches!(
            graph.split_edge(&key, [0.0, 0.0]),
            Err(Error::EdgeNotFound { .. })
        ));
    }

    #[test]
    fn test_pop_isolated_node() {
        let mut graph = Graph::new();
        let id = graph.add_node("default", NodeOptions::new()).unwrap();
        assert_eq!(graph.pop_node(id).unwrap(), None);
        assert!(graph.contains_node(id));
    }

    #[test]
    fn test_pop_node_only_outputs() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b"]);
        assert_eq!(graph.pop_node(ids[0]).unwrap(), None);
        assert_eq!(graph.edge_count(), 0);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    #[test]
    fn test_roots_leaves_and_neighbours() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b", "c"]);
        let lone = graph.add_node("note", NodeOptions::new()).unwrap();
        assert_eq!(graph.roots(), vec![ids[0], lone]);
        assert_eq!(graph.leaves(), vec![ids[2], lone]);
        assert_eq!(graph.input_nodes(ids[1]).unwrap(), vec![ids[0]]);
        assert_eq!(graph.output_nodes(ids[1]).unwrap(), vec![ids[2]]);
        assert_eq!(graph.port_edges(ids[1], "input").unwrap().len(), 1);
        assert!(graph.port_edges(ids[1], "nope").is_err());
    }

    #[test]
    fn test_traversal_excludes_start() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b", "c"]);
        assert_eq!(graph.downstream(ids[0]).unwrap(), vec![ids[1], ids[2]]);
        assert_eq!(graph.upstream(ids[2]).unwrap(), vec![ids[1], ids[0]]);
        assert!(graph.downstream(ids[2]).unwrap().is_empty());
    }

    #[test]
    fn test_topological_order_and_evaluate() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, &["a", "b", "c"]);
        assert_eq!(graph.topological_order().unwrap(), ids);
        graph.set_enabled(ids[1], false).unwrap();
        let eval = graph.evaluate().unwrap();
        assert_eq!(eval.order, ids);
        assert_eq!(eval.disabled, vec![ids[1]]);
    }
}
