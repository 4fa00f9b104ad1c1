//! Handlers for the scene and template commands.
//!
//! Each handler does its work through a function returning plain data or
//! text, then prints it; the data functions are what the tests exercise.

use crate::config::SceneGraphConfig;
use crate::error::{Error, Result};
use log::{debug, info};
use scenegraph_graph::{CommandOutput, Graph, GraphCommand, GraphSnapshot};
use scenegraph_template::{ParseReport, TemplateParser, UnparsedValuePolicy};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

// ============================================================================
// Templates
// ============================================================================

/// Parses a template file with the configured (or overridden) policy.
pub fn parse_template(
    config: &SceneGraphConfig,
    path: &Path,
    keep_raw: bool,
) -> Result<ParseReport> {
    let policy = if keep_raw {
        UnparsedValuePolicy::KeepRaw
    } else {
        config.graph.unparsed_values
    };
    Ok(TemplateParser::new().with_policy(policy).parse_file(path)?)
}

/// `template <FILE>`: print the parsed template as JSON; warnings go to
/// stderr.
pub fn cmd_template(config: &SceneGraphConfig, path: &Path, keep_raw: bool) -> Result<()> {
    let report = parse_template(config, path, keep_raw)?;
    for warning in &report.warnings {
        eprintln!("{}:{warning}", path.display());
    }
    let json = serde_json::to_string_pretty(&report.template.to_json())
        .map_err(scenegraph_core::Error::from)?;
    println!("{json}");
    Ok(())
}

// ============================================================================
// Scenes
// ============================================================================

/// Loads a scene file into a graph built from `config`.
pub fn load_scene(config: &SceneGraphConfig, path: &Path) -> Result<Graph> {
    let snapshot = GraphSnapshot::load(path)?;
    let mut graph = Graph::from_config(config.graph.clone())?;
    graph
        .restore(&snapshot)
        .map_err(|e| Error::InvalidScene {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    graph.drain_events();
    debug!(
        "Loaded {} with {} nodes and {} edges",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn names(graph: &Graph, ids: &[scenegraph_core::NodeId]) -> String {
    let names: Vec<&str> = ids
        .iter()
        .filter_map(|id| graph.node(*id).ok())
        .map(|n| n.name())
        .collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn write_scene(out: &mut impl std::fmt::Write, graph: &Graph) -> std::fmt::Result {
    writeln!(out, "Nodes: {}", graph.node_count())?;
    writeln!(out, "Edges: {}", graph.edge_count())?;
    writeln!(out, "Roots: {}", names(graph, &graph.roots()))?;
    writeln!(out, "Leaves: {}", names(graph, &graph.leaves()))?;
    for id in graph.node_ids() {
        let Ok(node) = graph.node(id) else { continue };
        let [x, y] = node.pos();
        let state = if node.enabled() { "" } else { " (disabled)" };
        writeln!(
            out,
            "  {} [{}] at ({x}, {y}), {} attribute(s){state}",
            node.name(),
            node.node_type(),
            node.attributes().count()
        )?;
        for edge in graph.outgoing_edges(id).unwrap_or_default() {
            let dest = graph.node(edge.dest_id).map(|n| n.name()).unwrap_or("?");
            writeln!(out, "    {} -> {dest}.{}", edge.src_attr, edge.dest_attr)?;
        }
    }
    Ok(())
}

/// Human-readable summary of a graph.
pub fn describe_scene(graph: &Graph) -> Result<String> {
    let mut out = String::new();
    write_scene(&mut out, graph)?;
    Ok(out)
}

/// `info <SCENE>`
pub fn cmd_info(config: &SceneGraphConfig, path: &Path) -> Result<()> {
    let graph = load_scene(config, path)?;
    print!("{}", describe_scene(&graph)?);
    Ok(())
}

/// Loads a scene and checks it can be evaluated. Returns a one-line
/// verdict.
pub fn validate_scene(config: &SceneGraphConfig, path: &Path) -> Result<String> {
    let graph = load_scene(config, path)?;
    let mut verdict = format!(
        "{}: OK ({} nodes, {} edges)",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    if !config.graph.allow_cycles {
        let eval = graph.evaluate().map_err(|e| Error::InvalidScene {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if !eval.disabled.is_empty() {
            write!(verdict, ", {} disabled", eval.disabled.len())?;
        }
    }
    Ok(verdict)
}

/// `validate <SCENE>`
pub fn cmd_validate(config: &SceneGraphConfig, path: &Path) -> Result<()> {
    println!("{}", validate_scene(config, path)?);
    Ok(())
}

/// Reads a JSON array of graph commands.
pub fn read_script(path: &Path) -> Result<Vec<GraphCommand>> {
    let json =
        fs::read_to_string(path).map_err(|e| scenegraph_core::Error::io_with_path(e, path))?;
    serde_json::from_str(&json).map_err(|e| Error::InvalidScript {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Replays `script` against `scene` and writes the result to `output`
/// (or back to `scene`). Nothing is written if any command fails.
pub fn apply_script(
    config: &SceneGraphConfig,
    scene: &Path,
    script: &Path,
    output: Option<&Path>,
) -> Result<Vec<CommandOutput>> {
    let mut graph = load_scene(config, scene)?;
    let commands = read_script(script)?;
    let count = commands.len();
    let outputs = graph.apply_all(commands)?;
    let target = output.unwrap_or(scene);
    graph.snapshot().save(target)?;
    info!("Applied {count} command(s); wrote {}", target.display());
    Ok(outputs)
}

/// `apply <SCENE> <SCRIPT> [-o OUT]`
pub fn cmd_apply(
    config: &SceneGraphConfig,
    scene: &Path,
    script: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let outputs = apply_script(config, scene, script, output)?;
    println!(
        "Applied {} command(s) to {}",
        outputs.len(),
        output.unwrap_or(scene).display()
    );
    Ok(())
}

/// `new <OUT>`: write an empty scene.
pub fn cmd_new(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::config(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }
    GraphSnapshot::default().save(path)?;
    println!("Created empty scene {}", path.display());
    Ok(())
}
