//! Nodes, node geometry, and node naming.
//!
//! A [`Node`] owns its attributes and its layout data. Position and size
//! are plain fields; renderers read them through [`Node::geometry`] and
//! write back through the graph, which records a
//! [`GraphEvent`](crate::GraphEvent) for every change.

use crate::attribute::{Attribute, AttributeProps, is_reserved};
use crate::registry::NodeTypeSpec;
use indexmap::IndexMap;
use log::warn;
use scenegraph_core::util::names::{normalize_name, unique_name};
use scenegraph_core::{Error, NodeId, Result, Value};
use scenegraph_template::Template;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default node width.
pub const DEFAULT_WIDTH: f64 = 100.0;
/// Default height of one node row.
pub const DEFAULT_BASE_HEIGHT: f64 = 15.0;
/// Default node color (RGBA).
pub const DEFAULT_COLOR: [u8; 4] = [172, 172, 172, 255];
/// Radius of a dot node.
pub const DOT_RADIUS: f64 = 8.0;
/// Height of a note node.
pub const NOTE_BASE_HEIGHT: f64 = 75.0;
/// Default layout orientation.
pub const DEFAULT_ORIENTATION: &str = "horizontal";
/// Default drawing style.
pub const DEFAULT_STYLE: &str = "default";
/// Name of the standard input port.
pub const INPUT_PORT: &str = "input";
/// Name of the standard output port.
pub const OUTPUT_PORT: &str = "output";

// ============================================================================
// NodeKind
// ============================================================================

/// Behaviour family of a node type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Regular DAG node; grows taller with its port count.
    #[default]
    Default,
    /// Small round pass-through node used to route edges.
    Dot,
    /// Free-text annotation without ports.
    Note,
}

impl NodeKind {
    /// Returns the lowercase tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Default => "default",
            NodeKind::Dot => "dot",
            NodeKind::Note => "note",
        }
    }

    /// Returns whether nodes of this kind may carry ports.
    pub fn supports_ports(&self) -> bool {
        !matches!(self, NodeKind::Note)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Naming
// ============================================================================

/// Hands out unique node names.
///
/// Nodes call [`claim`](Self::claim) on every name change; the registry
/// decides the name actually granted.
pub trait NameRegistry {
    /// Reserves a name for `id` and returns the granted name. A node
    /// re-claiming its own current name keeps it.
    fn claim(&mut self, id: NodeId, requested: &str) -> String;

    /// Frees whatever name `id` holds.
    fn release(&mut self, id: NodeId);
}

/// Name registry backed by hash maps.
///
/// Collisions are resolved by appending the lowest free integer suffix:
/// `dot`, `dot1`, `dot2`, ...
#[derive(Clone, Debug, Default)]
pub struct NameTable {
    by_name: HashMap<String, NodeId>,
    by_id: HashMap<NodeId, String>,
}

impl NameTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the node holding `name`.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Number of names held.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true when no names are held.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl NameRegistry for NameTable {
    fn claim(&mut self, id: NodeId, requested: &str) -> String {
        let mut base = normalize_name(requested);
        if base.is_empty() {
            base = "node".to_string();
        }
        let granted = unique_name(&base, |candidate| {
            self.by_name.get(candidate).is_some_and(|owner| *owner != id)
        });
        if let Some(old) = self.by_id.insert(id, granted.clone()) {
            self.by_name.remove(&old);
        }
        self.by_name.insert(granted.clone(), id);
        granted
    }

    fn release(&mut self, id: NodeId) {
        if let Some(name) = self.by_id.remove(&id) {
            self.by_name.remove(&name);
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Layout data handed to renderers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Top-left position.
    pub pos: [f64; 2],
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Whether ports are drawn on separate rows.
    pub expanded: bool,
    /// Fill color (RGBA).
    pub color: [u8; 4],
}

// ============================================================================
// Node
// ============================================================================

/// A typed node in a scene graph.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    node_type: String,
    kind: NodeKind,
    pub(crate) pos: [f64; 2],
    pub(crate) width: f64,
    pub(crate) base_height: f64,
    pub(crate) force_expand: bool,
    pub(crate) enabled: bool,
    pub(crate) color: [u8; 4],
    pub(crate) orientation: String,
    pub(crate) style: String,
    pub(crate) docstring: String,
    attributes: IndexMap<String, Attribute>,
    template: Arc<Template>,
}

impl Node {
    /// Builds a node of the given type with attributes taken from the
    /// type's template. The node starts with the type's default name;
    /// call [`rename`](Self::rename) to register it.
    pub fn new(id: NodeId, spec: &NodeTypeSpec) -> Self {
        let mut node = Self {
            id,
            name: spec.default_name.clone(),
            node_type: spec.node_type.clone(),
            kind: spec.kind,
            pos: [0.0, 0.0],
            width: spec.width,
            base_height: spec.base_height,
            force_expand: false,
            enabled: true,
            color: spec.color,
            orientation: DEFAULT_ORIENTATION.to_string(),
            style: DEFAULT_STYLE.to_string(),
            docstring: String::new(),
            attributes: IndexMap::new(),
            template: Arc::clone(&spec.template),
        };
        node.build_attributes();
        node
    }

    fn build_attributes(&mut self) {
        let template = Arc::clone(&self.template);
        for (name, record) in template.records() {
            if is_reserved(name) {
                warn!("{}: template attribute {name:?} uses a reserved name", self.node_type);
                continue;
            }
            if record.connectable && !self.kind.supports_ports() {
                warn!("{}: {} nodes cannot have port {name:?}", self.node_type, self.kind);
                continue;
            }
            let value = record.default_value().cloned().unwrap_or_default();
            let attr = Attribute::new(name, value, AttributeProps::from_record(record));
            self.attributes.insert(name.to_string(), attr);
        }
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node type tag.
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Behaviour family.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Template shared by all nodes of this type.
    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    /// Requests a new name through `registry` and adopts whatever name it
    /// grants.
    pub fn rename(&mut self, requested: &str, registry: &mut dyn NameRegistry) -> &str {
        self.name = registry.claim(self.id, requested);
        &self.name
    }

    pub(crate) fn restore_identity(&mut self, name: String) {
        self.name = name;
    }

    // ------------------------------------------------------------------------
    // Plain data
    // ------------------------------------------------------------------------

    /// Position of the top-left corner.
    pub fn pos(&self) -> [f64; 2] {
        self.pos
    }

    /// Node width.
    pub fn width(&self) -> f64 {
        match self.kind {
            NodeKind::Dot => DOT_RADIUS,
            _ => self.width,
        }
    }

    /// Height of one row.
    pub fn base_height(&self) -> f64 {
        match self.kind {
            NodeKind::Dot => DOT_RADIUS,
            _ => self.base_height,
        }
    }

    /// Whether the node is drawn expanded regardless of port count.
    pub fn force_expand(&self) -> bool {
        self.force_expand
    }

    /// Whether the node takes part in evaluation.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Fill color (RGBA).
    pub fn color(&self) -> [u8; 4] {
        self.color
    }

    /// Layout orientation.
    pub fn orientation(&self) -> &str {
        &self.orientation
    }

    /// Drawing style.
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Free-form documentation.
    pub fn docstring(&self) -> &str {
        &self.docstring
    }

    /// Moves the node.
    pub fn set_pos(&mut self, pos: [f64; 2]) {
        self.pos = pos;
    }

    /// Sets the fill color.
    pub fn set_color(&mut self, color: [u8; 4]) {
        self.color = color;
    }

    /// Enables or disables the node.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Forces expanded drawing.
    pub fn set_force_expand(&mut self, force: bool) {
        self.force_expand = force;
    }

    /// Sets the docstring.
    pub fn set_docstring(&mut self, doc: impl Into<String>) {
        self.docstring = doc.into();
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    fn port_rows(&self) -> usize {
        let inputs = self.attributes.values().filter(|a| a.is_input()).count();
        let outputs = self.attributes.values().filter(|a| a.is_output()).count();
        inputs.max(outputs)
    }

    /// Whether ports are drawn on separate rows.
    pub fn is_expanded(&self) -> bool {
        match self.kind {
            NodeKind::Default => self.force_expand || self.port_rows() > 1,
            NodeKind::Dot | NodeKind::Note => false,
        }
    }

    /// Node height derived from its port count.
    pub fn height(&self) -> f64 {
        match self.kind {
            NodeKind::Dot => DOT_RADIUS,
            NodeKind::Note => self.base_height,
            NodeKind::Default => {
                let mut rows = self.port_rows().max(1);
                let mut buffer = 0.0;
                if rows > 1 || self.force_expand {
                    rows += 1;
                    buffer = self.base_height / 2.0;
                }
                rows as f64 * self.base_height + buffer
            }
        }
    }

    /// Layout snapshot for renderers.
    pub fn geometry(&self) -> Geometry {
        Geometry {
            pos: self.pos,
            width: self.width(),
            height: self.height(),
            expanded: self.is_expanded(),
            color: self.color,
        }
    }

    /// Vertical offset of a port's anchor from the node's top edge.
    ///
    /// Returns `None` when the attribute is not a port.
    pub fn port_offset(&self, port: &str) -> Option<f64> {
        let attr = self.attributes.get(port).filter(|a| a.connectable)?;
        if !self.is_expanded() {
            return Some(self.height() / 2.0);
        }
        let row = self
            .attributes
            .values()
            .filter(|a| a.connectable && a.connection_type == attr.connection_type)
            .position(|a| a.name == attr.name)?;
        Some((row as f64 + 1.5) * self.base_height)
    }

    /// Evaluates the node. Disabled nodes report `false`.
    pub fn evaluate(&self) -> bool {
        self.enabled
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    /// All attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Attribute names in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Returns whether the node has the attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Looks up an attribute.
    pub fn attribute(&self, name: &str) -> Result<&Attribute> {
        self.attributes
            .get(name)
            .ok_or_else(|| Error::attribute_not_found(&self.name, name))
    }

    /// Looks up an attribute, creating an empty user attribute when absent.
    pub fn attribute_or_insert(&mut self, name: &str) -> Result<&Attribute> {
        if !self.attributes.contains_key(name) {
            self.add_attribute(name, Value::Null, AttributeProps::new())?;
        }
        self.attribute(name)
    }

    /// Reads an attribute value.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.attribute(name).map(|a| &a.value)
    }

    /// Writes an attribute value after checking the lock and the declared
    /// type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let node = self.name.clone();
        let attr = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| Error::attribute_not_found(&node, name))?;
        if attr.locked {
            return Err(Error::Locked {
                node,
                attribute: name.to_string(),
            });
        }
        if !attr.accepts(&value) {
            return Err(Error::TypeMismatch {
                attribute: name.to_string(),
                expected: attr.type_name().to_string(),
                found: found_type(&value),
            });
        }
        attr.value = match &attr.attr_type {
            Some(t) => t.coerce(value),
            None => value,
        };
        Ok(())
    }

    /// Adds a new attribute.
    ///
    /// Properties not given in `props` are taken from the template record
    /// of the same name, if any.
    pub fn add_attribute(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        props: AttributeProps,
    ) -> Result<&Attribute> {
        let value = value.into();
        if is_reserved(name) {
            return Err(Error::ReservedName {
                name: name.to_string(),
            });
        }
        if self.attributes.contains_key(name) {
            return Err(Error::AttributeExists {
                node: self.name.clone(),
                attribute: name.to_string(),
            });
        }
        let props = match self.template.find(name) {
            Some(record) => props.or(AttributeProps::from_record(record)),
            None => props,
        };
        if props.is_connectable() && !self.kind.supports_ports() {
            return Err(Error::Unsupported {
                node_type: self.node_type.clone(),
                message: format!("cannot add port {name:?}"),
            });
        }
        let fits = match &props.attr_type {
            Some(t) => t.accepts(&value),
            None => value.is_finite(),
        };
        if !fits || props.default_value.as_ref().is_some_and(|d| !d.is_finite()) {
            return Err(Error::TypeMismatch {
                attribute: name.to_string(),
                expected: props.attr_type.as_ref().map_or("any", |t| t.name()).to_string(),
                found: found_type(&value),
            });
        }
        let attr = Attribute::new(name, value, props);
        self.attributes.insert(name.to_string(), attr);
        self.attribute(name)
    }

    /// Renames an attribute, keeping its position.
    pub fn rename_attribute(&mut self, old: &str, new: &str) -> Result<()> {
        if old == new {
            return self.attribute(old).map(|_| ());
        }
        if is_reserved(new) {
            return Err(Error::ReservedName {
                name: new.to_string(),
            });
        }
        if self.attributes.contains_key(new) {
            return Err(Error::AttributeExists {
                node: self.name.clone(),
                attribute: new.to_string(),
            });
        }
        let index = self
            .attributes
            .get_index_of(old)
            .ok_or_else(|| Error::attribute_not_found(&self.name, old))?;
        if let Some((_, mut attr)) = self.attributes.shift_remove_index(index) {
            attr.name = new.to_string();
            self.attributes.shift_insert(index, new.to_string(), attr);
        }
        Ok(())
    }

    /// Removes an attribute.
    pub fn remove_attribute(&mut self, name: &str) -> Result<Attribute> {
        self.attributes
            .shift_remove(name)
            .ok_or_else(|| Error::attribute_not_found(&self.name, name))
    }

    pub(crate) fn replace_attributes(&mut self, attributes: IndexMap<String, Attribute>) {
        self.attributes = attributes;
    }

    pub(crate) fn attribute_map(&self) -> &IndexMap<String, Attribute> {
        &self.attributes
    }

    // ------------------------------------------------------------------------
    // Ports
    // ------------------------------------------------------------------------

    /// Input ports in declaration order.
    pub fn inputs(&self) -> Vec<&Attribute> {
        self.attributes.values().filter(|a| a.is_input()).collect()
    }

    /// Output ports in declaration order.
    pub fn outputs(&self) -> Vec<&Attribute> {
        self.attributes.values().filter(|a| a.is_output()).collect()
    }

    /// All ports in declaration order.
    pub fn connections(&self) -> Vec<&Attribute> {
        self.attributes.values().filter(|a| a.connectable).collect()
    }

    /// Looks up a port of either direction.
    pub fn port(&self, name: &str) -> Result<&Attribute> {
        self.attributes
            .get(name)
            .filter(|a| a.connectable)
            .ok_or_else(|| Error::port_not_found(&self.name, name))
    }

    /// Looks up an input port.
    pub fn input(&self, name: &str) -> Result<&Attribute> {
        match self.port(name)? {
            attr if attr.is_input() => Ok(attr),
            _ => Err(Error::port_not_found(&self.name, name)),
        }
    }

    /// Looks up an output port.
    pub fn output(&self, name: &str) -> Result<&Attribute> {
        match self.port(name)? {
            attr if attr.is_output() => Ok(attr),
            _ => Err(Error::port_not_found(&self.name, name)),
        }
    }
}

fn found_type(value: &Value) -> String {
    if value.is_finite() {
        value.type_name().to_string()
    } else {
        format!("non-finite {}", value.type_name())
    }
}
