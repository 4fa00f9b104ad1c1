//! Common test utilities for SceneGraph integration tests.

use scenegraph_core::NodeId;
use scenegraph_graph::{EdgeKey, EdgeSpec, Graph, NodeOptions};
use std::collections::HashSet;

/// Test harness wrapping a graph with the built-in node types.
pub struct SceneHarness {
    /// Graph under test
    pub graph: Graph,
}

impl SceneHarness {
    /// Creates a harness around an empty graph.
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
        }
    }

    /// Adds a node of `node_type` named `name` at the origin.
    pub fn add(&mut self, node_type: &str, name: &str) -> NodeId {
        self.graph
            .add_node(node_type, NodeOptions::new().with_name(name))
            .expect("node should be created")
    }

    /// Connects `src.output` to `dest.input`.
    pub fn connect(&mut self, src: NodeId, dest: NodeId) -> EdgeKey {
        self.graph
            .add_edge(EdgeSpec::new(src, "output", dest, "input"), false)
            .expect("edge should be created")
    }

    /// Every edge as a set of keys.
    pub fn edge_set(&self) -> HashSet<EdgeKey> {
        self.graph.edges().map(|e| e.key()).collect()
    }
}

impl Default for SceneHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Key for the standard `output -> input` edge between two nodes.
pub fn standard_key(src: NodeId, dest: NodeId) -> EdgeKey {
    EdgeKey::new(src, "output", dest, "input")
}
