//! Integration tests for loading node types from template directories.

use scenegraph_core::Value;
use scenegraph_graph::{EdgeSpec, Graph, GraphConfig, NodeOptions};
use std::fs;

const LIGHT_TEMPLATE: &str = r#"
[input input]
max_connections INT 1

[input shadow]
max_connections INT 1

[output output]
max_connections INT 0

[group Light]
[attr intensity]
default FLOAT 1.5
label STRING "Intensity"

[attr color_temp]
default INT 6500
"#;

#[test]
fn test_custom_type_from_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("light.mtd"), LIGHT_TEMPLATE).unwrap();
    fs::write(
        dir.path().join("asset.mtd"),
        "[group Asset]\n[attr shot]\ndefault STRING \"sh010\"\n",
    )
    .unwrap();

    let config = GraphConfig::default().with_template_dir(dir.path());
    let mut graph = Graph::from_config(config).unwrap();

    let light = graph.add_node("light", NodeOptions::new()).unwrap();
    let node = graph.node(light).unwrap();
    assert_eq!(node.name(), "light");
    assert_eq!(node.get("intensity").unwrap(), &Value::Float(1.5));
    assert_eq!(node.attribute("intensity").unwrap().label.as_deref(), Some("Intensity"));
    assert_eq!(node.inputs().len(), 2);
    assert!(node.is_expanded());

    // merged over the built-in asset type
    let asset = graph.add_node("asset", NodeOptions::new()).unwrap();
    let node = graph.node(asset).unwrap();
    assert_eq!(node.get("shot").unwrap(), &Value::from("sh010"));
    assert_eq!(node.get("version").unwrap(), &Value::Int(1));

    graph
        .add_edge(EdgeSpec::new(asset, "output", light, "shadow"), false)
        .unwrap();
    assert_eq!(graph.port_edges(light, "shadow").unwrap().len(), 1);
}

#[test]
fn test_missing_template_dir_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraphConfig::default().with_template_dir(dir.path().join("absent"));
    let graph = Graph::from_config(config).unwrap();
    assert_eq!(graph.registry().len(), 4);
}
