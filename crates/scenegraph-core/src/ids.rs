//! Node identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node in a scene graph.
///
/// Internally represented as a UUID v4. A node's id is assigned once at
/// creation and never changes; snapshots persist it so restored graphs keep
/// the same identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Creates a new random node ID.
    ///
    /// # Examples
    ///
    /// ```
    /// use scenegraph_core::NodeId;
    ///
    /// let a = NodeId::new();
    /// let b = NodeId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a node ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_node_id_new_is_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2, "Each new ID should be unique");
    }

    #[test]
    fn test_node_id_serializes_as_plain_string() {
        let uuid = Uuid::new_v4();
        let id = NodeId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn test_node_id_from_str_rejects_garbage() {
        assert!("not-a-uuid".parse::<NodeId>().is_err());
    }

    proptest! {
        #[test]
        fn test_node_id_display_parse_roundtrip(raw in any::<u128>()) {
            let id = NodeId::from_uuid(Uuid::from_u128(raw));
            let parsed: NodeId = id.to_string().parse().unwrap();
            prop_assert_eq!(id, parsed);
        }
    }
}
