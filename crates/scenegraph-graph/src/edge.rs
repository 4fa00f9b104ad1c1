//! Edges between node ports.

use scenegraph_core::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight given to edges created without one.
pub const DEFAULT_WEIGHT: f32 = 1.0;

fn default_weight() -> f32 {
    DEFAULT_WEIGHT
}

/// How an edge is drawn. Has no effect on graph semantics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    /// Smooth curve.
    #[default]
    Bezier,
    /// Right-angled segments.
    Polygon,
    /// Straight line.
    Straight,
}

/// Identity of an edge: the two ports it joins.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source node.
    pub src_id: NodeId,
    /// Output port on the source node.
    pub src_attr: String,
    /// Destination node.
    pub dest_id: NodeId,
    /// Input port on the destination node.
    pub dest_attr: String,
}

impl EdgeKey {
    /// Creates a key.
    pub fn new(
        src_id: NodeId,
        src_attr: impl Into<String>,
        dest_id: NodeId,
        dest_attr: impl Into<String>,
    ) -> Self {
        Self {
            src_id,
            src_attr: src_attr.into(),
            dest_id,
            dest_attr: dest_attr.into(),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.src_id, self.src_attr, self.dest_id, self.dest_attr
        )
    }
}

/// A directed connection from an output port to an input port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node.
    pub src_id: NodeId,
    /// Output port on the source node.
    pub src_attr: String,
    /// Destination node.
    pub dest_id: NodeId,
    /// Input port on the destination node.
    pub dest_attr: String,
    /// Edge weight.
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Drawing style.
    #[serde(default)]
    pub style: EdgeStyle,
}

impl Edge {
    /// Returns this edge's identity.
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(
            self.src_id,
            self.src_attr.clone(),
            self.dest_id,
            self.dest_attr.clone(),
        )
    }

    /// Returns whether this edge has the given identity.
    pub fn matches(&self, key: &EdgeKey) -> bool {
        self.src_id == key.src_id
            && self.dest_id == key.dest_id
            && self.src_attr == key.src_attr
            && self.dest_attr == key.dest_attr
    }
}

/// Request to connect two ports.
///
/// # Example
///
/// ```rust
/// use scenegraph_core::NodeId;
/// use scenegraph_graph::{EdgeSpec, EdgeStyle};
///
/// let (a, b) = (NodeId::new(), NodeId::new());
/// let spec = EdgeSpec::new(a, "output", b, "input").with_style(EdgeStyle::Straight);
/// assert_eq!(spec.weight, 1.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Source node.
    pub src: NodeId,
    /// Output port on the source node.
    pub src_attr: String,
    /// Destination node.
    pub dest: NodeId,
    /// Input port on the destination node.
    pub dest_attr: String,
    /// Edge weight.
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Drawing style.
    #[serde(default)]
    pub style: EdgeStyle,
}

impl EdgeSpec {
    /// Creates a spec with default weight and style.
    pub fn new(
        src: NodeId,
        src_attr: impl Into<String>,
        dest: NodeId,
        dest_attr: impl Into<String>,
    ) -> Self {
        Self {
            src,
            src_attr: src_attr.into(),
            dest,
            dest_attr: dest_attr.into(),
            weight: DEFAULT_WEIGHT,
            style: EdgeStyle::default(),
        }
    }

    /// Sets the weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the drawing style.
    pub fn with_style(mut self, style: EdgeStyle) -> Self {
        self.style = style;
        self
    }

    /// Identity of the edge this spec would create.
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(
            self.src,
            self.src_attr.clone(),
            self.dest,
            self.dest_attr.clone(),
        )
    }

    pub(crate) fn into_edge(self) -> Edge {
        Edge {
            src_id: self.src,
            src_attr: self.src_attr,
            dest_id: self.dest,
            dest_attr: self.dest_attr,
            weight: self.weight,
            style: self.style,
        }
    }
}

impl From<&Edge> for EdgeSpec {
    fn from(edge: &Edge) -> Self {
        Self {
            src: edge.src_id,
            src_attr: edge.src_attr.clone(),
            dest: edge.dest_id,
            dest_attr: edge.dest_attr.clone(),
            weight: edge.weight,
            style: edge.style,
        }
    }
}
