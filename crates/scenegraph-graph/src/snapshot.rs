//! Serializable graph snapshots.
//!
//! A [`GraphSnapshot`] is a complete copy of graph state: every node with
//! its layout data and attributes, and every edge. Snapshots back the undo
//! history and are the on-disk scene format.

use crate::attribute::{Attribute, is_reserved};
use crate::edge::{Edge, EdgeSpec};
use crate::event::GraphEvent;
use crate::graph::Graph;
use crate::history::DictDiffer;
use crate::node::Node;
use indexmap::IndexMap;
use log::debug;
use scenegraph_core::{Error, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// NodeSnapshot
// ============================================================================

/// Saved state of one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Node type tag.
    pub node_type: String,
    /// Display name.
    pub name: String,
    /// Position.
    pub pos: [f64; 2],
    /// Fill color.
    pub color: [u8; 4],
    /// Width.
    pub width: f64,
    /// Row height.
    pub base_height: f64,
    /// Forced expansion flag.
    #[serde(default)]
    pub force_expand: bool,
    /// Enabled flag.
    pub enabled: bool,
    /// Layout orientation.
    pub orientation: String,
    /// Drawing style.
    pub style: String,
    /// Documentation.
    #[serde(default)]
    pub docstring: String,
    /// Attributes in declaration order.
    #[serde(default)]
    pub attributes: IndexMap<String, Attribute>,
}

impl From<&Node> for NodeSnapshot {
    fn from(node: &Node) -> Self {
        Self {
            node_type: node.node_type().to_string(),
            name: node.name().to_string(),
            pos: node.pos,
            color: node.color,
            width: node.width,
            base_height: node.base_height,
            force_expand: node.force_expand,
            enabled: node.enabled,
            orientation: node.orientation.clone(),
            style: node.style.clone(),
            docstring: node.docstring.clone(),
            attributes: node.attribute_map().clone(),
        }
    }
}

// ============================================================================
// GraphSnapshot
// ============================================================================

/// Saved state of a whole graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes by id.
    #[serde(default)]
    pub nodes: BTreeMap<NodeId, NodeSnapshot>,
    /// Edges, sorted by key.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Differences between two snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Node changes, keyed by node name.
    pub nodes: DictDiffer<String>,
    /// Edge changes, keyed by `src.attr->dest.attr`.
    pub edges: DictDiffer<String>,
}

impl SnapshotDiff {
    /// Returns true when the snapshots are identical.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl GraphSnapshot {
    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the snapshot to `path` as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| Error::io_with_path(e, path))?;
        debug!("Saved scene to {}", path.display());
        Ok(())
    }

    /// Reads a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        Self::from_json(&json)
    }

    fn node_label(&self, id: &NodeId) -> String {
        self.nodes
            .get(id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn keyed_nodes(&self) -> BTreeMap<String, &NodeSnapshot> {
        self.nodes.values().map(|n| (n.name.clone(), n)).collect()
    }

    fn keyed_edges(&self) -> BTreeMap<String, &Edge> {
        self.edges
            .iter()
            .map(|e| {
                let key = format!(
                    "{}.{}->{}.{}",
                    self.node_label(&e.src_id),
                    e.src_attr,
                    self.node_label(&e.dest_id),
                    e.dest_attr
                );
                (key, e)
            })
            .collect()
    }

    /// Compares this snapshot against an earlier one.
    pub fn diff(&self, past: &GraphSnapshot) -> SnapshotDiff {
        SnapshotDiff {
            nodes: DictDiffer::new(&self.keyed_nodes(), &past.keyed_nodes()),
            edges: DictDiffer::new(&self.keyed_edges(), &past.keyed_edges()),
        }
    }
}

// ============================================================================
// Graph integration
// ============================================================================

impl Graph {
    /// Captures the current state.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes()
            .map(|n| (n.id(), NodeSnapshot::from(n)))
            .collect();
        let mut edges: Vec<Edge> = self.edges().cloned().collect();
        edges.sort_by_key(Edge::key);
        GraphSnapshot { nodes, edges }
    }

    /// Replaces the whole graph with `snapshot`.
    ///
    /// The snapshot is rebuilt into fresh state first; if any node type is
    /// unknown, a name is duplicated, an attribute is malformed, or an edge
    /// is invalid, the call fails
    /// with `InvalidSnapshot` and the graph is unchanged. On success a
    /// single [`GraphEvent::Restored`] is queued.
    pub fn restore(&mut self, snapshot: &GraphSnapshot) -> Result<()> {
        let mut fresh = self.empty_like();
        for (&id, saved) in &snapshot.nodes {
            let spec = self.registry().get(&saved.node_type).map_err(|_| {
                Error::invalid_snapshot(format!(
                    "node {id} has unknown type {:?}",
                    saved.node_type
                ))
            })?;
            let mut node = Node::new(id, spec);
            node.restore_identity(saved.name.clone());
            node.pos = saved.pos;
            node.color = saved.color;
            node.width = saved.width;
            node.base_height = saved.base_height;
            node.force_expand = saved.force_expand;
            node.enabled = saved.enabled;
            node.orientation = saved.orientation.clone();
            node.style = saved.style.clone();
            node.docstring = saved.docstring.clone();
            check_attributes(id, &node, &saved.attributes)?;
            node.replace_attributes(saved.attributes.clone());
            fresh.insert_node(node)?;
        }
        for edge in &snapshot.edges {
            for end in [edge.src_id, edge.dest_id] {
                if !fresh.contains_node(end) {
                    return Err(Error::invalid_snapshot(format!(
                        "edge {} references missing node {end}",
                        edge.key()
                    )));
                }
            }
            fresh
                .add_edge(EdgeSpec::from(edge), false)
                .map_err(|e| Error::invalid_snapshot(format!("edge {}: {e}", edge.key())))?;
        }
        debug!(
            "Restored {} nodes and {} edges",
            fresh.node_count(),
            fresh.edge_count()
        );
        self.replace_state(fresh);
        self.push_event(GraphEvent::Restored);
        Ok(())
    }
}

fn check_attributes(
    id: NodeId,
    node: &Node,
    attributes: &IndexMap<String, Attribute>,
) -> Result<()> {
    for (key, attr) in attributes {
        let problem = if attr.name != *key {
            Some(format!("is stored under {key:?}"))
        } else if is_reserved(key) {
            Some("uses a reserved name".to_string())
        } else if attr.connectable && !node.kind().supports_ports() {
            Some(format!("is a port on a {} node", node.node_type()))
        } else if !attr.value.is_finite() || !attr.default_value.is_finite() {
            Some("holds a non-finite float".to_string())
        } else {
            None
        };
        if let Some(problem) = problem {
            return Err(Error::invalid_snapshot(format!(
                "node {id}: attribute {:?} {problem}",
                attr.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attribute::AttributeProps;
    use crate::graph::NodeOptions;
    use scenegraph_core::Value;

    fn sample() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new();
        let a = graph
            .add_node("asset", NodeOptions::at([10.0, 20.0]).with_name("plate"))
            .unwrap();
        let b = graph
            .add_node("default", NodeOptions::new().with_name("grade"))
            .unwrap();
        graph.add_edge(EdgeSpec::new(a, "output", b, "input"), false).unwrap();
        (graph, a, b)
    }

    #[test]
    fn test_snapshot_contents() {
        let (graph, a, _) = sample();
        let snap = graph.snapshot();
        assert_eq!(snap.nodes.len(), 2);
        assert_eq!(snap.edges.len(), 1);
        let plate = &snap.nodes[&a];
        assert_eq!(plate.node_type, "asset");
        assert_eq!(plate.pos, [10.0, 20.0]);
        assert_eq!(plate.attributes["version"].value, Value::Int(1));
    }

    #[test]
    fn test_restore_round_trip() {
        let (mut graph, a, b) = sample();
        graph.set_attribute(a, "filename", "/show/plate.exr").unwrap();
        let snap = graph.snapshot();

        graph.remove_node(b).unwrap();
        graph.rename_node(a, "other").unwrap();
        graph.drain_events();

        graph.restore(&snap).unwrap();
        assert_eq!(graph.snapshot(), snap);
        assert_eq!(graph.node_by_name("plate").unwrap().id(), a);
        assert_eq!(graph.drain_events(), vec![GraphEvent::Restored]);
    }

    #[test]
    fn test_restore_keeps_names_claimable() {
        let (mut graph, _, _) = sample();
        let snap = graph.snapshot();
        graph.restore(&snap).unwrap();
        let c = graph
            .add_node("default", NodeOptions::new().with_name("grade"))
            .unwrap();
        assert_eq!(graph.node(c).unwrap().name(), "grade1");
    }

    #[test]
    fn test_restore_rejects_unknown_type() {
        let (mut graph, a, _) = sample();
        let mut snap = graph.snapshot();
        snap.nodes.get_mut(&a).unwrap().node_type = "camera".to_string();
        let before = graph.snapshot();
        assert!(matches!(
            graph.restore(&snap),
            Err(Error::InvalidSnapshot { .. })
        ));
        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn test_restore_rejects_dangling_edge() {
        let (mut graph, _, b) = sample();
        let mut snap = graph.snapshot();
        snap.nodes.remove(&b);
        assert!(matches!(
            graph.restore(&snap),
            Err(Error::InvalidSnapshot { .. })
        ));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_restore_rejects_duplicate_names() {
        let (mut graph, a, b) = sample();
        let mut snap = graph.snapshot();
        snap.nodes.get_mut(&b).unwrap().name = snap.nodes[&a].name.clone();
        assert!(matches!(
            graph.restore(&snap),
            Err(Error::InvalidSnapshot { .. })
        ));
    }

    #[test]
    fn test_restore_rejects_malformed_attributes() {
        let (mut graph, a, _) = sample();
        let good = graph.snapshot();

        let mut renamed = good.clone();
        let attrs = &mut renamed.nodes.get_mut(&a).unwrap().attributes;
        attrs.get_mut("version").unwrap().name = "take".to_string();

        let mut reserved = good.clone();
        let attrs = &mut reserved.nodes.get_mut(&a).unwrap().attributes;
        let mut attr = attrs["version"].clone();
        attr.name = "style".to_string();
        attrs.insert("style".to_string(), attr);

        let mut note_port = good.clone();
        let note = graph.add_node("note", NodeOptions::new()).unwrap();
        let mut port = good.nodes[&a].attributes["output"].clone();
        let mut note_snap = NodeSnapshot::from(graph.node(note).unwrap());
        port.name = "out".to_string();
        note_snap.attributes.insert("out".to_string(), port);
        note_port.nodes.insert(note, note_snap);

        for snap in [renamed, reserved, note_port] {
            let err = graph.restore(&snap).unwrap_err();
            assert!(matches!(err, Error::InvalidSnapshot { .. }), "{err}");
        }
        assert_eq!(graph.node_count(), 3);
        graph.restore(&good).unwrap();
        assert_eq!(graph.snapshot(), good);
    }

    #[test]
    fn test_float_attributes_survive_json() {
        let (mut graph, a, _) = sample();
        graph
            .add_attribute(a, "gain", 0.1, AttributeProps::new().with_default(2.5))
            .unwrap();
        assert!(graph.set_attribute(a, "gain", f64::INFINITY).is_err());
        graph.set_attribute(a, "gain", -1e300).unwrap();

        let snap = graph.snapshot();
        let loaded = GraphSnapshot::from_json(&snap.to_json().unwrap()).unwrap();
        assert_eq!(loaded, snap);
        assert_eq!(
            loaded.nodes[&a].attributes["gain"].value,
            Value::Float(-1e300)
        );
    }

    #[test]
    fn test_save_and_load() {
        let (graph, _, _) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let snap = graph.snapshot();
        snap.save(&path).unwrap();
        assert_eq!(GraphSnapshot::load(&path).unwrap(), snap);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = GraphSnapshot::load("/nonexistent/scene.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scene.json"));
    }

    #[test]
    fn test_diff_by_name() {
        let (mut graph, a, b) = sample();
        let past = graph.snapshot();
        graph.set_position(a, [0.0, 0.0]).unwrap();
        graph.remove_edges_between(a, b).unwrap();
        graph.add_node("note", NodeOptions::new()).unwrap();

        let diff = graph.snapshot().diff(&past);
        assert_eq!(diff.nodes.output(), "plate changed");
        assert!(diff.nodes.added().contains("note"));
        assert!(diff.edges.removed().contains("plate.output->grade.input"));
        assert!(!diff.is_empty());
        assert!(graph.snapshot().diff(&graph.snapshot()).is_empty());
    }
}
