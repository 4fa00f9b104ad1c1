//! Integration tests for splitting edges with dot nodes.

use scenegraph_graph::{DOT_NODE_TYPE, EdgeKey, NodeKind};
use std::collections::HashSet;

use crate::common::{SceneHarness, standard_key};

#[test]
fn test_split_edge_inserts_one_dot() {
    let mut harness = SceneHarness::new();
    let a = harness.add("asset", "a");
    let b = harness.add("asset", "b");
    let edge = harness.connect(a, b);
    let nodes_before: HashSet<_> = harness.graph.node_ids().into_iter().collect();

    let dot = harness.graph.split_edge(&edge, [40.0, 12.0]).unwrap();

    let nodes_after: HashSet<_> = harness.graph.node_ids().into_iter().collect();
    let new_nodes: Vec<_> = nodes_after.difference(&nodes_before).collect();
    assert_eq!(new_nodes, vec![&dot]);

    let node = harness.graph.node(dot).unwrap();
    assert_eq!(node.node_type(), DOT_NODE_TYPE);
    assert_eq!(node.kind(), NodeKind::Dot);
    assert_eq!(node.pos(), [40.0, 12.0]);

    let expected: HashSet<EdgeKey> = [standard_key(a, dot), standard_key(dot, b)].into();
    assert_eq!(harness.edge_set(), expected);
    assert!(!harness.graph.has_edge(&edge));
}

#[test]
fn test_split_twice_chains_dots() {
    let mut harness = SceneHarness::new();
    let a = harness.add("default", "a");
    let b = harness.add("default", "b");
    let edge = harness.connect(a, b);

    let first = harness.graph.split_edge(&edge, [10.0, 0.0]).unwrap();
    let second = harness
        .graph
        .split_edge(&standard_key(first, b), [20.0, 0.0])
        .unwrap();

    assert_eq!(harness.graph.node(first).unwrap().name(), "dot");
    assert_eq!(harness.graph.node(second).unwrap().name(), "dot1");
    assert_eq!(harness.graph.downstream(a).unwrap(), vec![first, second, b]);
}
