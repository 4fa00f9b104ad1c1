//! Integration tests for scene files and undo.

use scenegraph_core::Value;
use scenegraph_graph::{Graph, GraphSnapshot, NodeOptions, UndoStack};

use crate::common::SceneHarness;

#[test]
fn test_scene_file_round_trip() {
    let mut harness = SceneHarness::new();
    let plate = harness.add("asset", "plate");
    let grade = harness.add("default", "grade");
    harness.connect(plate, grade);
    harness
        .graph
        .set_attribute(plate, "filename", "/show/sh010/plate.exr")
        .unwrap();
    harness.graph.set_docstring(grade, "primary grade").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    harness.graph.snapshot().save(&path).unwrap();

    let mut loaded = Graph::new();
    loaded.restore(&GraphSnapshot::load(&path).unwrap()).unwrap();
    assert_eq!(loaded.snapshot(), harness.graph.snapshot());
    assert_eq!(
        loaded.node(plate).unwrap().get("filename").unwrap(),
        &Value::from("/show/sh010/plate.exr")
    );
    assert_eq!(loaded.node(grade).unwrap().docstring(), "primary grade");
}

#[test]
fn test_undo_session() {
    let mut graph = Graph::new();
    let mut undo = UndoStack::from_config(graph.config());

    let (plate, cmd) = graph
        .record("add plate", |g| {
            g.add_node("asset", NodeOptions::new().with_name("plate"))
        })
        .unwrap();
    undo.push(cmd.unwrap(), &mut graph).unwrap();

    let (_, cmd) = graph
        .record("bump version", |g| g.set_attribute(plate, "version", 2))
        .unwrap();
    undo.push(cmd.unwrap(), &mut graph).unwrap();

    let (_, cmd) = graph
        .record("move plate", |g| g.set_position(plate, [30.0, 40.0]))
        .unwrap();
    let cmd = cmd.unwrap();
    assert_eq!(cmd.after().diff(cmd.before()).nodes.output(), "plate changed");
    undo.push(cmd, &mut graph).unwrap();

    assert_eq!(undo.undo_text(), Some("move plate"));
    undo.undo(&mut graph).unwrap();
    undo.undo(&mut graph).unwrap();
    let node = graph.node(plate).unwrap();
    assert_eq!(node.pos(), [0.0, 0.0]);
    assert_eq!(node.get("version").unwrap(), &Value::Int(1));

    undo.redo(&mut graph).unwrap();
    assert_eq!(graph.node(plate).unwrap().get("version").unwrap(), &Value::Int(2));
    assert_eq!(undo.redo_text(), Some("move plate"));

    undo.undo(&mut graph).unwrap();
    undo.undo(&mut graph).unwrap();
    assert!(graph.is_empty());
    assert!(!undo.can_undo());
}
