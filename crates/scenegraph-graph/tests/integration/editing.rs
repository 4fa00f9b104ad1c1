//! Integration tests for node creation, forced connections and popping.

use scenegraph_core::{Error, NodeId, Value};
use scenegraph_graph::{AttributeProps, EdgeSpec, GraphEvent, NodeOptions};

use crate::common::{SceneHarness, standard_key};

#[test]
fn test_add_default_node_at_origin() {
    let mut harness = SceneHarness::new();
    let id = harness
        .graph
        .add_node("default", NodeOptions::at([0.0, 0.0]))
        .unwrap();

    let parsed: NodeId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);

    let node = harness.graph.node(id).unwrap();
    assert_eq!(node.color(), [172, 172, 172, 255]);
    assert_eq!(node.pos(), [0.0, 0.0]);
    let names: Vec<&str> = node.attribute_names().collect();
    assert_eq!(names, vec!["input", "output"]);
    assert!(node.attributes().all(|a| !a.user));
}

#[test]
fn test_forced_edge_evicts_existing_connection() {
    let mut harness = SceneHarness::new();
    let n1 = harness.add("asset", "n1");
    let n2 = harness.add("asset", "n2");
    let n3 = harness.add("asset", "n3");

    let original = harness.connect(n1, n2);
    let err = harness
        .graph
        .add_edge(EdgeSpec::new(n3, "output", n2, "input"), false)
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { max: 1, .. }));
    assert!(harness.graph.has_edge(&original));

    harness.graph.drain_events();
    let forced = harness
        .graph
        .add_edge(EdgeSpec::new(n3, "output", n2, "input"), true)
        .unwrap();
    assert!(!harness.graph.has_edge(&original));
    assert!(harness.graph.has_edge(&forced));
    assert_eq!(harness.graph.edge_count(), 1);
    assert_eq!(
        harness.graph.drain_events(),
        vec![
            GraphEvent::EdgeRemoved { edge: original },
            GraphEvent::EdgeAdded { edge: forced },
        ]
    );
}

#[test]
fn test_unbounded_output_feeds_many() {
    let mut harness = SceneHarness::new();
    let src = harness.add("asset", "plate");
    for name in ["a", "b", "c"] {
        let dest = harness.add("default", name);
        harness.connect(src, dest);
    }
    assert_eq!(harness.graph.port_edges(src, "output").unwrap().len(), 3);
    assert_eq!(harness.graph.output_nodes(src).unwrap().len(), 3);
}

#[test]
fn test_pop_single_predecessor_and_successor() {
    let mut harness = SceneHarness::new();
    let p = harness.add("default", "p");
    let x = harness.add("default", "x");
    let s = harness.add("default", "s");
    let px = harness.connect(p, x);
    let xs = harness.connect(x, s);

    let bridged = harness.graph.pop_node(x).unwrap();
    assert_eq!(bridged, Some(standard_key(p, s)));
    assert!(!harness.graph.has_edge(&px));
    assert!(!harness.graph.has_edge(&xs));
    assert_eq!(harness.graph.edge_count(), 1);
    assert!(harness.graph.contains_node(x));
    assert!(harness.graph.incoming_edges(x).unwrap().is_empty());
}

#[test]
fn test_pop_with_two_predecessors_only_detaches() {
    let mut harness = SceneHarness::new();
    let p1 = harness.add("default", "p1");
    let p2 = harness.add("default", "p2");
    let x = harness.add("default", "x");
    let s = harness.add("default", "s");
    harness
        .graph
        .add_attribute(x, "matte", Value::Null, AttributeProps::new().input())
        .unwrap();
    harness.connect(p1, x);
    harness
        .graph
        .add_edge(EdgeSpec::new(p2, "output", x, "matte"), false)
        .unwrap();
    harness.connect(x, s);

    assert_eq!(harness.graph.pop_node(x).unwrap(), None);
    assert_eq!(harness.graph.edge_count(), 0);
    assert_eq!(harness.graph.node_count(), 4);
}

#[test]
fn test_pop_keeps_outer_port_names() {
    let mut harness = SceneHarness::new();
    let p = harness.add("default", "p");
    let x = harness.add("dot", "x");
    let s = harness.add("default", "s");
    harness
        .graph
        .add_attribute(p, "mask", Value::Null, AttributeProps::new().output())
        .unwrap();
    harness
        .graph
        .add_attribute(s, "matte", Value::Null, AttributeProps::new().input())
        .unwrap();
    harness
        .graph
        .add_edge(EdgeSpec::new(p, "mask", x, "input"), false)
        .unwrap();
    harness
        .graph
        .add_edge(EdgeSpec::new(x, "output", s, "matte"), false)
        .unwrap();

    let bridged = harness.graph.pop_node(x).unwrap().unwrap();
    assert_eq!(bridged.src_attr, "mask");
    assert_eq!(bridged.dest_attr, "matte");
}

#[test]
fn test_remove_middle_node_leaves_no_dangling_edges() {
    let mut harness = SceneHarness::new();
    let a = harness.add("default", "a");
    let b = harness.add("default", "b");
    let c = harness.add("default", "c");
    harness.connect(a, b);
    harness.connect(b, c);

    harness.graph.remove_node(b).unwrap();
    assert!(harness.edge_set().is_empty());
    assert_eq!(harness.graph.roots(), vec![a, c]);
}

#[test]
fn test_move_subgraph_downstream() {
    let mut harness = SceneHarness::new();
    let a = harness.add("default", "a");
    let b = harness.add("default", "b");
    let c = harness.add("default", "c");
    let other = harness.add("note", "other");
    harness.connect(a, b);
    harness.connect(b, c);

    harness.graph.move_by(a, [0.0, 50.0], true).unwrap();
    for id in [a, b, c] {
        assert_eq!(harness.graph.node(id).unwrap().pos(), [0.0, 50.0]);
    }
    assert_eq!(harness.graph.node(other).unwrap().pos(), [0.0, 0.0]);
}
