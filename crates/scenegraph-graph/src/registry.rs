//! Node type registry.
//!
//! The registry maps a node type tag (`default`, `dot`, `asset`, ...) to
//! everything needed to build nodes of that type: behaviour kind, default
//! name and color, size, and the parsed attribute template. Templates are
//! parsed once and shared by every node of the type.
//!
//! # Example
//!
//! ```rust
//! use scenegraph_graph::{NodeKind, NodeTypeRegistry};
//!
//! let registry = NodeTypeRegistry::with_builtins();
//! let asset = registry.get("asset").unwrap();
//! assert_eq!(asset.kind, NodeKind::Default);
//! assert_eq!(asset.color, [174, 188, 43, 255]);
//! assert_eq!(asset.template.inputs(), vec!["input"]);
//! ```

use crate::config::GraphConfig;
use crate::node::{
    DEFAULT_BASE_HEIGHT, DEFAULT_COLOR, DEFAULT_WIDTH, DOT_RADIUS, NOTE_BASE_HEIGHT, NodeKind,
};
use indexmap::IndexMap;
use log::{debug, info, warn};
use scenegraph_core::{Error, Result};
use scenegraph_template::{Template, TemplateParser, UnparsedValuePolicy};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_TEMPLATE: &str = include_str!("../templates/default.mtd");
const ASSET_TEMPLATE: &str = include_str!("../templates/asset.mtd");
const DOT_TEMPLATE: &str = include_str!("../templates/dot.mtd");
const NOTE_TEMPLATE: &str = include_str!("../templates/note.mtd");

/// Template file extension.
pub const TEMPLATE_EXTENSION: &str = "mtd";

// ============================================================================
// NodeTypeSpec
// ============================================================================

/// Everything needed to construct nodes of one type.
#[derive(Clone, Debug)]
pub struct NodeTypeSpec {
    /// Type tag.
    pub node_type: String,
    /// Behaviour family.
    pub kind: NodeKind,
    /// Name given to new nodes before de-duplication.
    pub default_name: String,
    /// Default fill color.
    pub color: [u8; 4],
    /// Default width.
    pub width: f64,
    /// Default row height.
    pub base_height: f64,
    /// Attribute template shared by all nodes of this type.
    pub template: Arc<Template>,
}

impl NodeTypeSpec {
    /// Creates a spec with the kind's default size and an empty template.
    pub fn new(node_type: impl Into<String>, kind: NodeKind) -> Self {
        let node_type = node_type.into();
        let (width, base_height) = match kind {
            NodeKind::Default => (DEFAULT_WIDTH, DEFAULT_BASE_HEIGHT),
            NodeKind::Dot => (DOT_RADIUS, DOT_RADIUS),
            NodeKind::Note => (DEFAULT_WIDTH, NOTE_BASE_HEIGHT),
        };
        Self {
            default_name: node_type.clone(),
            node_type,
            kind,
            color: DEFAULT_COLOR,
            width,
            base_height,
            template: Arc::new(Template::new()),
        }
    }

    /// Sets the default node name.
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Sets the default color.
    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    /// Sets the default size.
    pub fn with_size(mut self, width: f64, base_height: f64) -> Self {
        self.width = width;
        self.base_height = base_height;
        self
    }

    /// Sets the attribute template.
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Arc::new(template);
        self
    }
}

// ============================================================================
// NodeTypeRegistry
// ============================================================================

/// Registry of node types, keyed by type tag.
#[derive(Clone, Debug, Default)]
pub struct NodeTypeRegistry {
    types: IndexMap<String, NodeTypeSpec>,
}

impl NodeTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in types: `default`, `dot`,
    /// `note` and `asset`.
    pub fn with_builtins() -> Self {
        Self::builtins(UnparsedValuePolicy::default())
    }

    /// Like [`with_builtins`](Self::with_builtins) with an explicit parse
    /// policy for the embedded templates.
    pub fn builtins(policy: UnparsedValuePolicy) -> Self {
        let mut parser = TemplateParser::new().with_policy(policy);
        let mut parse = |name: &str, text: &str| {
            let report = parser.parse_str(text);
            for warning in &report.warnings {
                warn!("built-in template {name}: {warning}");
            }
            report.template
        };

        let mut registry = Self::new();
        registry.register(
            NodeTypeSpec::new("default", NodeKind::Default)
                .with_default_name("node")
                .with_template(parse("default", DEFAULT_TEMPLATE)),
        );
        registry.register(
            NodeTypeSpec::new("dot", NodeKind::Dot).with_template(parse("dot", DOT_TEMPLATE)),
        );
        registry.register(
            NodeTypeSpec::new("note", NodeKind::Note)
                .with_color([255, 239, 62, 255])
                .with_template(parse("note", NOTE_TEMPLATE)),
        );
        registry.register(
            NodeTypeSpec::new("asset", NodeKind::Default)
                .with_color([174, 188, 43, 255])
                .with_template(parse("asset", ASSET_TEMPLATE)),
        );
        registry
    }

    /// Builds the built-in registry and loads every configured template
    /// directory on top of it.
    pub fn from_config(config: &GraphConfig) -> Result<Self> {
        let mut registry = Self::builtins(config.unparsed_values);
        for dir in &config.template_dirs {
            registry.load_dir(dir, config.unparsed_values)?;
        }
        Ok(registry)
    }

    /// Registers a type, returning the spec it replaced.
    pub fn register(&mut self, spec: NodeTypeSpec) -> Option<NodeTypeSpec> {
        debug!("Registering node type: {}", spec.node_type);
        self.types.insert(spec.node_type.clone(), spec)
    }

    /// Looks up a type.
    pub fn get(&self, node_type: &str) -> Result<&NodeTypeSpec> {
        self.types
            .get(node_type)
            .ok_or_else(|| Error::UnknownNodeType {
                node_type: node_type.to_string(),
            })
    }

    /// Returns whether a type is registered.
    pub fn contains(&self, node_type: &str) -> bool {
        self.types.contains_key(node_type)
    }

    /// Registered type tags in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Registered specs in registration order.
    pub fn types(&self) -> impl Iterator<Item = &NodeTypeSpec> {
        self.types.values()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Loads every `*.mtd` file in `dir`.
    ///
    /// The file stem is the type tag. A template for a known type is merged
    /// over the existing one; an unknown stem registers a new `Default`-kind
    /// type. Returns the tags touched, sorted by file path.
    pub fn load_dir(
        &mut self,
        dir: impl AsRef<Path>,
        policy: UnparsedValuePolicy,
    ) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        let escaped = glob::Pattern::escape(&dir.to_string_lossy());
        let pattern = Path::new(&escaped).join(format!("*.{TEMPLATE_EXTENSION}"));
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::config(format!("invalid template pattern {pattern}: {e}")))?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::io_with_path(e.into_error(), path)
            })?;
            paths.push(path);
        }
        paths.sort();

        let mut parser = TemplateParser::new().with_policy(policy);
        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let node_type = stem.to_string();
            let report = parser.parse_file(&path)?;
            if !report.is_clean() {
                warn!(
                    "{}: {} template warning(s)",
                    path.display(),
                    report.warnings.len()
                );
            }
            match self.types.get_mut(&node_type) {
                Some(spec) => {
                    Arc::make_mut(&mut spec.template).merge(&report.template);
                }
                None => {
                    self.register(
                        NodeTypeSpec::new(&node_type, NodeKind::Default)
                            .with_template(report.template),
                    );
                }
            }
            loaded.push(node_type);
        }
        info!(
            "Loaded {} node type template(s) from {}",
            loaded.len(),
            dir.display()
        );
        Ok(loaded)
    }
}
