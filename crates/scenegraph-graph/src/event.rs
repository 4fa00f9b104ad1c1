//! Change notifications for renderers and other observers.

use crate::edge::EdgeKey;
use scenegraph_core::NodeId;
use serde::{Deserialize, Serialize};

/// A change made to a [`Graph`](crate::Graph).
///
/// The graph queues one event per change; observers collect them with
/// [`Graph::drain_events`](crate::Graph::drain_events).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GraphEvent {
    /// A node was inserted.
    NodeAdded {
        /// New node.
        id: NodeId,
    },
    /// A node was removed.
    NodeRemoved {
        /// Removed node.
        id: NodeId,
    },
    /// A node field or attribute changed.
    NodeChanged {
        /// Changed node.
        id: NodeId,
        /// Field or attribute name.
        field: String,
    },
    /// An edge was inserted.
    EdgeAdded {
        /// New edge.
        edge: EdgeKey,
    },
    /// An edge was removed.
    EdgeRemoved {
        /// Removed edge.
        edge: EdgeKey,
    },
    /// The whole graph was replaced from a snapshot.
    Restored,
}

impl GraphEvent {
    /// Node the event is about, if it concerns a single node.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            GraphEvent::NodeAdded { id }
            | GraphEvent::NodeRemoved { id }
            | GraphEvent::NodeChanged { id, .. } => Some(*id),
            _ => None,
        }
    }
}
